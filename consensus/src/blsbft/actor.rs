use super::{
    aggregator,
    ingress::{Control, Mailbox, Message},
    metrics::Inbound,
    rules::{self, Candidate, Check},
    store::{Inserted, ProposalStore},
    wire::{Envelope, Payload, Propose},
    Config, Error, MiningKeySet, SigningMode, Snapshot, ValidationData, Vote,
};
use crate::{Block, ChainAdapter, CommitteeResolver, NodeTransport, View};
use bytes::Bytes;
use futures::{channel::mpsc, StreamExt};
use prometheus_client::metrics::{counter::Counter, family::Family, gauge::Gauge};
use shardbft_codec::{Decode, Encode};
use shardbft_cryptography::{Digest, Signer, Verifier};
use shardbft_macros::select;
use shardbft_runtime::{Clock, Handle, Metrics, Spawner};
use shardbft_utils::SystemTimeExt;
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};
use tracing::{debug, info, trace, warn};

/// Drives proposing, voting, and committing for a single chain.
pub struct Actor<
    E: Clock + Spawner + Metrics,
    C: ChainAdapter,
    T: NodeTransport,
    R: CommitteeResolver,
> {
    context: E,
    chain: C,
    transport: T,
    resolver: R,
    keys: Vec<MiningKeySet>,

    chain_key: String,
    namespace: Vec<u8>,
    timeslot: Duration,
    tick: Duration,
    gc_interval: Duration,
    idle_timeout: Duration,
    revalidate_interval: Duration,
    validation_timeout: Duration,
    propose_history: usize,
    max_block_size: usize,

    mailbox: Mailbox,
    proposes: mpsc::Receiver<Message<Propose>>,
    votes: mpsc::Receiver<Message<Vote>>,
    control: mpsc::Receiver<Control>,

    running: bool,
    store: ProposalStore<C::Block>,

    /// Last candidate voted for at each height.
    voted: BTreeMap<u64, Candidate>,

    /// Timeslots we proposed in.
    proposed: BTreeMap<u64, Digest>,

    /// Bodies that passed validation at each height.
    valid_bodies: BTreeMap<u64, BTreeSet<Digest>>,

    current_timeslot: Gauge,
    best_height: Gauge,
    tracked_proposals: Gauge,
    proposed_blocks: Counter,
    votes_sent: Counter,
    committed_blocks: Counter,
    invalid_votes: Counter,
    received_messages: Family<Inbound, Counter>,
}

impl<E: Clock + Spawner + Metrics, C: ChainAdapter, T: NodeTransport, R: CommitteeResolver>
    Actor<E, C, T, R>
{
    pub fn new(context: E, cfg: Config<C, T, R>) -> (Self, Mailbox) {
        cfg.assert();

        // Initialize metrics
        let current_timeslot = Gauge::default();
        let best_height = Gauge::default();
        let tracked_proposals = Gauge::default();
        let proposed_blocks = Counter::default();
        let votes_sent = Counter::default();
        let committed_blocks = Counter::default();
        let invalid_votes = Counter::default();
        let received_messages = Family::<Inbound, Counter>::default();
        context.register(
            "current_timeslot",
            "current timeslot",
            current_timeslot.clone(),
        );
        context.register("best_height", "height of the best block", best_height.clone());
        context.register(
            "tracked_proposals",
            "number of proposals tracked",
            tracked_proposals.clone(),
        );
        context.register(
            "proposed_blocks",
            "number of blocks proposed",
            proposed_blocks.clone(),
        );
        context.register("votes_sent", "number of votes sent", votes_sent.clone());
        context.register(
            "committed_blocks",
            "number of blocks committed",
            committed_blocks.clone(),
        );
        context.register(
            "invalid_votes",
            "number of votes that failed verification",
            invalid_votes.clone(),
        );
        context.register(
            "received_messages",
            "number of messages received",
            received_messages.clone(),
        );

        // Initialize mailbox
        let (propose_sender, proposes) = mpsc::channel(cfg.mailbox_size);
        let (vote_sender, votes) = mpsc::channel(cfg.mailbox_size);
        let (control_sender, control) = mpsc::channel(cfg.mailbox_size);
        let mailbox = Mailbox::new(propose_sender, vote_sender, control_sender);

        (
            Self {
                context,
                chain: cfg.chain,
                transport: cfg.transport,
                resolver: cfg.resolver,
                keys: cfg.keys,

                chain_key: cfg.chain_key,
                namespace: cfg.namespace,
                timeslot: cfg.timeslot,
                tick: cfg.tick,
                gc_interval: cfg.gc_interval,
                idle_timeout: cfg.idle_timeout,
                revalidate_interval: cfg.revalidate_interval,
                validation_timeout: cfg.validation_timeout,
                propose_history: cfg.propose_history,
                max_block_size: cfg.max_block_size,

                mailbox: mailbox.clone(),
                proposes,
                votes,
                control,

                running: false,
                store: ProposalStore::default(),
                voted: BTreeMap::new(),
                proposed: BTreeMap::new(),
                valid_bodies: BTreeMap::new(),

                current_timeslot,
                best_height,
                tracked_proposals,
                proposed_blocks,
                votes_sent,
                committed_blocks,
                invalid_votes,
                received_messages,
            },
            mailbox,
        )
    }

    /// Run the control loop until the runtime is stopped.
    pub fn start(self) -> Handle<()> {
        self.context.clone().spawn(|_| self.run())
    }

    async fn run(mut self) {
        let mut shutdown = self.context.stopped();
        let mut next_tick = self.context.current() + self.tick;
        let mut next_gc = self.context.current() + self.gc_interval;
        loop {
            select! {
                _ = &mut shutdown => {
                    debug!(chain = %self.chain_key, "shutdown");
                    return;
                },
                control = self.control.next() => {
                    let Some(control) = control else {
                        debug!(chain = %self.chain_key, "control closed");
                        return;
                    };
                    self.handle_control(control);
                },
                _ = self.context.sleep_until(next_tick) => {
                    next_tick = self.context.current() + self.tick;
                    if self.running {
                        self.on_tick().await;
                    }
                },
                _ = self.context.sleep_until(next_gc) => {
                    next_gc = self.context.current() + self.gc_interval;
                    self.gc();
                },
                message = self.proposes.next() => {
                    let Some(message) = message else {
                        return;
                    };
                    self.received_messages.get_or_create(&Inbound::PROPOSE).inc();
                    if !self.running {
                        trace!(height = message.height, "dropping proposal while stopped");
                        continue;
                    }
                    self.handle_propose(message);
                },
                message = self.votes.next() => {
                    let Some(message) = message else {
                        return;
                    };
                    self.received_messages.get_or_create(&Inbound::VOTE).inc();
                    if !self.running {
                        trace!(height = message.height, "dropping vote while stopped");
                        continue;
                    }
                    self.handle_vote(message).await;
                },
            }
        }
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Start { response } => {
                let result = if self.running {
                    Err(Error::AlreadyStarted)
                } else {
                    self.running = true;
                    info!(chain = %self.chain_key, keys = self.keys.len(), "started");
                    Ok(())
                };
                let _ = response.send(result);
            }
            Control::Stop { response } => {
                let result = if !self.running {
                    Err(Error::AlreadyStopped)
                } else {
                    self.running = false;
                    info!(chain = %self.chain_key, "stopped");
                    Ok(())
                };
                let _ = response.send(result);
            }
            Control::LoadKeys { keys } => {
                info!(chain = %self.chain_key, keys = keys.len(), "loaded keys");
                self.keys = keys;
            }
            Control::SignData { data, response } => {
                let result = match self.keys.first() {
                    Some(keys) => Ok(keys.bridge().sign(None, &data)),
                    None => Err(Error::SignData("no keys loaded".into())),
                };
                let _ = response.send(result);
            }
            Control::ValidateData {
                data,
                signature,
                signer,
                response,
            } => {
                let _ = response.send(signer.verify(None, &data, &signature));
            }
        }
    }

    async fn on_tick(&mut self) {
        let timeslot = self.context.current().timeslot(self.timeslot);
        self.current_timeslot.set(timeslot as i64);
        if !self.chain.is_ready() {
            trace!(chain = %self.chain_key, "chain not ready");
            return;
        }
        let Some(best) = self.chain.best_view() else {
            return;
        };
        let final_height = self.chain.final_view().map_or(0, |view| view.height);
        self.best_height.set(best.height as i64);

        if let Err(err) = self.propose(timeslot, &best).await {
            warn!(?err, timeslot, "failed to propose");
        }
        self.commit(&best);
        self.vote(timeslot, &best, final_height).await;
        self.tracked_proposals.set(self.store.len() as i64);
    }

    /// Propose a block if one of our keys leads `timeslot`.
    async fn propose(&mut self, timeslot: u64, best: &View) -> Result<(), Error> {
        if best.propose_timeslot >= timeslot || self.proposed.contains_key(&timeslot) {
            return Ok(());
        }
        let Some(reference) = self.resolver.current() else {
            return Ok(());
        };
        let full = self
            .resolver
            .committee(&reference)
            .ok_or(Error::UnknownCommittee)?;
        let Some(snapshot) = Snapshot::new(reference, full, self.resolver.mode(&reference), timeslot)
        else {
            return Ok(());
        };
        let Some(keys) = self
            .keys
            .iter()
            .find(|keys| keys.identity() == snapshot.proposer && snapshot.is_signer(&keys.identity()))
            .cloned()
        else {
            return Ok(());
        };

        // Only try once per timeslot
        self.proposed.insert(timeslot, best.hash);
        while self.proposed.len() > self.propose_history {
            self.proposed.pop_first();
        }

        // Prefer re-proposing the earliest produced valid candidate on top of the best block
        let old = self
            .store
            .at_height(best.height + 1)
            .into_iter()
            .filter_map(|hash| {
                let record = self.store.get(&hash)?;
                let block = record.block.as_ref()?;
                (record.is_validated && block.parent() == best.hash).then(|| block.clone())
            })
            .min_by_key(|block| (block.produce_timeslot(), block.hash()));

        let mut chain = self.chain.clone();
        let proposer = snapshot.proposer.clone();
        let committee = snapshot.full.clone();
        let deadline = self.timeslot / 2;
        let result = match old {
            Some(old) => {
                debug!(
                    timeslot,
                    produced = old.produce_timeslot(),
                    hash = ?old.hash(),
                    "re-proposing block"
                );
                self.context
                    .timeout(deadline, async move {
                        chain
                            .recreate_block(&old, &proposer, timeslot, &committee, reference)
                            .await
                    })
                    .await
            }
            None => {
                self.context
                    .timeout(deadline, async move {
                        chain
                            .create_block(&proposer, timeslot, &committee, reference)
                            .await
                    })
                    .await
            }
        };
        let mut block = match result {
            Ok(Ok(block)) => block,
            Ok(Err(err)) => return Err(Error::BlockCreation(err.to_string())),
            Err(_) => return Err(Error::Timeout),
        };

        // Sign as producer of this version
        let hash = block.hash();
        let producer = keys.bridge().sign(None, &hash);
        block.set_validation(ValidationData::provisional(producer).encode().freeze());
        self.proposed.insert(timeslot, hash);
        self.proposed_blocks.inc();
        info!(timeslot, height = block.height(), ?hash, "proposed block");

        let envelope = Envelope {
            chain_key: self.chain_key.clone(),
            timeslot,
            height: block.height(),
            payload: Payload::Propose(Propose {
                peer: self.transport.self_peer(),
                block: block.encode().freeze(),
            }),
        };
        self.broadcast(envelope);
        Ok(())
    }

    /// Send `envelope` to peers (and proposals back to ourselves).
    fn broadcast(&self, envelope: Envelope) {
        let mut transport = self.transport.clone();
        let mut mailbox = self.mailbox.clone();
        let chain_key = self.chain_key.clone();
        self.context
            .with_label("broadcast")
            .spawn(move |_| async move {
                let message = envelope.encode().freeze();
                if let Err(err) = transport.broadcast(&chain_key, message).await {
                    warn!(?err, "failed to broadcast");
                }
                if matches!(envelope.payload, Payload::Propose(_)) {
                    mailbox.deliver(envelope).await;
                }
            });
    }

    fn handle_propose(&mut self, message: Message<Propose>) {
        if message.chain_key != self.chain_key {
            trace!(chain = %message.chain_key, "dropping proposal for other chain");
            return;
        }
        if message.payload.block.len() > self.max_block_size {
            debug!(size = message.payload.block.len(), "dropping oversized proposal");
            return;
        }
        let block = match self.chain.decode_block(&message.payload.block) {
            Ok(block) => block,
            Err(err) => {
                debug!(?err, peer = %message.payload.peer, "failed to decode block");
                return;
            }
        };
        let Some(best) = self.chain.best_view() else {
            return;
        };
        let hash = block.hash();
        let height = block.height();
        if height <= best.height {
            trace!(height, best = best.height, ?hash, "dropping stale proposal");
            return;
        }

        // Freeze the committees of the proposal
        let reference = block.committee();
        let Some(full) = self.resolver.committee(&reference) else {
            debug!(?reference, ?hash, "unknown committee");
            return;
        };
        let mode = self.resolver.mode(&reference);
        let Some(snapshot) = Snapshot::new(reference, full, mode, block.propose_timeslot()) else {
            return;
        };
        if &snapshot.proposer != block.proposer() {
            debug!(
                ?hash,
                proposer = %block.proposer(),
                expected = %snapshot.proposer,
                "dropping proposal from wrong proposer"
            );
            return;
        }
        let parent = block.parent();
        if !self
            .store
            .insert_block(block, snapshot, self.context.current())
        {
            trace!(?hash, "duplicate proposal");
            return;
        }
        debug!(height, ?hash, peer = %message.payload.peer, "received proposal");

        // Fetch the parent if we have never seen it
        if self.chain.view(&parent).is_none() && self.store.get(&parent).is_none() {
            let mut transport = self.transport.clone();
            let chain = self.chain.chain();
            let peer = message.payload.peer;
            self.context.with_label("request").spawn(move |_| async move {
                if let Err(err) = transport.request_missing(peer, vec![parent], chain).await {
                    debug!(?err, ?parent, "failed to request missing block");
                }
            });
        }
    }

    async fn handle_vote(&mut self, message: Message<Vote>) {
        if message.chain_key != self.chain_key {
            trace!(chain = %message.chain_key, "dropping vote for other chain");
            return;
        }
        let vote = message.payload;
        let hash = vote.block;
        let validator = vote.validator.clone();
        let resolver = &self.resolver;
        // A record first seen through a vote uses the committee leading the sender's timeslot.
        // The proposal replaces this snapshot (and reclassifies the votes) if it differs.
        let timeslot = message.timeslot;
        let inserted = self.store.insert_vote(
            vote,
            || {
                let reference = resolver.current()?;
                let full = resolver.committee(&reference)?;
                Snapshot::new(reference, full, resolver.mode(&reference), timeslot)
            },
            self.context.current(),
        );
        if inserted == Inserted::Duplicate {
            trace!(?hash, %validator, "duplicate vote");
            return;
        }
        trace!(?hash, %validator, "received vote");

        // The proposer votes for its own block once someone else did
        let Some(record) = self.store.get(&hash) else {
            return;
        };
        if record.proposer_sent_vote {
            return;
        }
        let Some(block) = &record.block else {
            return;
        };
        let proposer = block.proposer().clone();
        if validator == proposer {
            return;
        }
        let Some(keys) = self.keys.iter().find(|k| k.identity() == proposer).cloned() else {
            return;
        };

        // A failed validation is retried on the next external vote
        if !self.validate(&hash).await {
            return;
        }
        if let Some(record) = self.store.get_mut(&hash) {
            record.proposer_sent_vote = true;
        }
        let timeslot = self.context.current().timeslot(self.timeslot);
        self.send_votes(&hash, &[keys], timeslot);
    }

    /// Validate the block of a record (at most once per body).
    async fn validate(&mut self, hash: &Digest) -> bool {
        let now = self.context.current();
        let Some(record) = self.store.get_mut(hash) else {
            return false;
        };
        if record.is_validated {
            return true;
        }
        let (Some(block), Some(snapshot)) = (&record.block, &record.snapshot) else {
            return false;
        };
        record.last_validation = Some(now);
        let height = block.height();
        let body = block.body();
        if self
            .valid_bodies
            .get(&height)
            .is_some_and(|bodies| bodies.contains(&body))
        {
            record.is_validated = true;
            return true;
        }

        let block = block.clone();
        let signing = snapshot.signing.clone();
        let full = snapshot.full.clone();
        let mut chain = self.chain.clone();
        let result = self
            .context
            .timeout(self.validation_timeout, async move {
                chain.validate_pre_sign(&block, &signing, &full).await
            })
            .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(?err, height, ?hash, "block failed validation");
                return false;
            }
            Err(_) => {
                warn!(height, ?hash, "block validation timed out");
                return false;
            }
        }
        self.valid_bodies.entry(height).or_default().insert(body);
        if let Some(record) = self.store.get_mut(hash) {
            record.is_validated = true;
        }
        true
    }

    /// Keys that may vote for a record (members of the signing committee other than the proposer).
    fn signers(&self, hash: &Digest) -> Vec<MiningKeySet> {
        let Some(record) = self.store.get(hash) else {
            return Vec::new();
        };
        let (Some(block), Some(snapshot)) = (&record.block, &record.snapshot) else {
            return Vec::new();
        };
        self.keys
            .iter()
            .filter(|keys| {
                let identity = keys.identity();
                &identity != block.proposer() && snapshot.is_signer(&identity)
            })
            .cloned()
            .collect()
    }

    /// Sign a record with each of `keys`, store the votes, and broadcast them.
    fn send_votes(&mut self, hash: &Digest, keys: &[MiningKeySet], timeslot: u64) {
        let now = self.context.current();
        let Some(block) = self.store.get(hash).and_then(|record| record.block.as_ref()) else {
            return;
        };
        let parent = block.parent();
        let height = block.height();
        let requires_bridge = block.requires_bridge();
        for keys in keys {
            let vote = Vote::sign(keys, &self.namespace, *hash, parent, requires_bridge);
            self.store.insert_vote(vote.clone(), || None, now);
            self.votes_sent.inc();
            debug!(height, ?hash, validator = %keys.identity(), "voted");
            self.broadcast(Envelope {
                chain_key: self.chain_key.clone(),
                timeslot,
                height,
                payload: Payload::Vote(vote),
            });
        }
    }

    /// Validate and vote for candidates on top of the best block.
    async fn vote(&mut self, timeslot: u64, best: &View, final_height: u64) {
        let now = self.context.current();
        self.store.prune_below(final_height);

        // Vote for the best block if it was inserted before we could
        let retry = self.store.get(&best.hash).is_some_and(|record| {
            !record.is_voted
                && record.block.is_some()
                && record.last_validation.map_or(true, |last| {
                    now.duration_since(last).unwrap_or_default() >= self.revalidate_interval
                })
        });
        if retry && self.validate(&best.hash).await {
            let keys = self.signers(&best.hash);
            if let Some(record) = self.store.get_mut(&best.hash) {
                record.is_voted = true;
            }
            if !keys.is_empty() {
                debug!(height = best.height, hash = ?best.hash, "voting for best block");
                self.send_votes(&best.hash, &keys, timeslot);
            }
        }

        // Check candidates in the order they were produced
        let check = Check {
            now,
            timeslot,
            best_height: best.height,
            revalidate_interval: self.revalidate_interval,
        };
        let mut candidates: Vec<(u64, Digest)> = self
            .store
            .at_height(best.height + 1)
            .into_iter()
            .filter_map(|hash| {
                let record = self.store.get(&hash)?;
                if record.is_voted {
                    return None;
                }
                let block = record.block.as_ref()?;
                let fields = (
                    block.height(),
                    block.produce_timeslot(),
                    block.propose_timeslot(),
                );
                match rules::filter(&check, Some(fields), record.last_validation) {
                    Ok(()) => Some((block.produce_timeslot(), hash)),
                    Err(reason) => {
                        trace!(?hash, ?reason, "skipping proposal");
                        None
                    }
                }
            })
            .collect();
        candidates.sort();

        for (_, hash) in candidates {
            if !self.validate(&hash).await {
                continue;
            }
            let Some(block) = self.store.get(&hash).and_then(|record| record.block.as_ref())
            else {
                continue;
            };
            let height = block.height();
            let candidate = Candidate::of(block);
            if !rules::should_vote(self.voted.get(&height), &candidate) {
                trace!(height, ?hash, "already voted for a better candidate");
                continue;
            }
            let keys = self.signers(&hash);
            if keys.is_empty() {
                continue;
            }
            self.voted.insert(height, candidate);
            if let Some(record) = self.store.get_mut(&hash) {
                record.is_voted = true;
            }
            self.send_votes(&hash, &keys, timeslot);
        }
    }

    /// Classify new votes and insert every block that reached quorum.
    fn commit(&mut self, best: &View) {
        for hash in self.store.unprocessed() {
            let Some(record) = self.store.get_mut(&hash) else {
                continue;
            };
            for vote in record.classify(&self.namespace) {
                self.invalid_votes.inc();
                warn!(?hash, validator = %vote.validator, "invalid vote");
            }
            if record.is_committed || !record.has_quorum() {
                continue;
            }

            // Check again next tick until the quorum is committed
            record.has_unprocessed_vote = true;
            let (Some(block), Some(snapshot)) = (&record.block, &record.snapshot) else {
                continue;
            };

            // Already inserted (by us or through sync)
            if self.chain.view(&hash).is_some() {
                record.commit();
                record.has_unprocessed_vote = false;
                trace!(?hash, best = ?best.hash, "quorum for known block");
                continue;
            }
            let parent = block.parent();
            if self.chain.view(&parent).is_none() {
                debug!(?hash, ?parent, "parent not connected");
                continue;
            }

            // Combine the votes
            let producer = match ValidationData::decode_cfg(
                block.validation().clone(),
                &snapshot.signing.len(),
            ) {
                Ok(data) => data.producer,
                Err(err) => {
                    warn!(?err, ?hash, "invalid validation data");
                    continue;
                }
            };
            let data = match aggregator::aggregate(snapshot, &record.votes, producer) {
                Ok(data) => data,
                Err(err) => {
                    warn!(?err, ?hash, "failed to aggregate votes");
                    continue;
                }
            };
            if !aggregator::verify(snapshot, &data, &self.namespace, &hash) {
                warn!(?hash, "aggregate signature failed verification");
                continue;
            }
            let subset = matches!(snapshot.mode, SigningMode::Subset(_));
            let mut block = block.clone();
            block.set_validation(data.encode().freeze());
            record.commit();
            record.has_unprocessed_vote = false;
            let votes = record.valid;
            let height = block.height();
            self.committed_blocks.inc();
            info!(height, ?hash, votes, "committed block");

            // Shards signed by subsets also finalize the votes gathered for the parent
            let prev = if subset && !self.chain.chain().is_beacon() {
                self.predecessor(&parent)
            } else {
                None
            };
            self.store.remove(&parent);

            let mut chain = self.chain.clone();
            self.context.with_label("insert").spawn(move |_| async move {
                let result = match prev {
                    Some(prev) => chain.insert_and_broadcast_with_prev(block, prev).await,
                    None => chain.insert_and_broadcast(block).await,
                };
                if let Err(err) = result {
                    warn!(?err, height, ?hash, "failed to insert block");
                }
            });
        }
    }

    /// Aggregate the votes held for the parent of a committed block (if any).
    fn predecessor(&mut self, parent: &Digest) -> Option<Bytes> {
        let record = self.store.get_mut(parent)?;
        for vote in record.classify(&self.namespace) {
            self.invalid_votes.inc();
            warn!(hash = ?parent, validator = %vote.validator, "invalid vote");
        }
        let (Some(block), Some(snapshot)) = (&record.block, &record.snapshot) else {
            return None;
        };
        let producer =
            ValidationData::decode_cfg(block.validation().clone(), &snapshot.signing.len())
                .ok()?
                .producer;
        let data = match aggregator::aggregate(snapshot, &record.votes, producer) {
            Ok(data) => data,
            Err(err) => {
                debug!(?err, hash = ?parent, "unable to aggregate parent votes");
                return None;
            }
        };
        if !aggregator::verify(snapshot, &data, &self.namespace, parent) {
            debug!(hash = ?parent, "parent votes not sufficient");
            return None;
        }
        Some(data.encode().freeze())
    }

    /// Drop proposals that can no longer be finalized.
    fn gc(&mut self) {
        let final_height = self.chain.final_view().map_or(0, |view| view.height);
        let removed = self
            .store
            .prune(final_height, self.context.current(), self.idle_timeout);
        self.voted.retain(|height, _| *height > final_height);
        self.valid_bodies.retain(|height, _| *height > final_height);
        self.tracked_proposals.set(self.store.len() as i64);
        debug!(
            final_height,
            removed,
            tracked = self.store.len(),
            "pruned proposals"
        );
    }
}
