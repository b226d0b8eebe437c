use crate::{
    blsbft::{SigningMode, Validator},
    CommitteeResolver,
};
use shardbft_cryptography::Digest;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

struct State {
    current: Digest,
    committees: HashMap<Digest, (Vec<Validator>, SigningMode)>,
}

/// Committees known ahead of time (the current one can be rotated).
#[derive(Clone)]
pub struct Committees {
    state: Arc<Mutex<State>>,
}

impl Committees {
    pub fn new(reference: Digest, committee: Vec<Validator>, mode: SigningMode) -> Self {
        let mut committees = HashMap::new();
        committees.insert(reference, (committee, mode));
        Self {
            state: Arc::new(Mutex::new(State {
                current: reference,
                committees,
            })),
        }
    }

    /// Register a committee and make it current.
    pub fn rotate(&self, reference: Digest, committee: Vec<Validator>, mode: SigningMode) {
        let mut state = self.state.lock().unwrap();
        state.committees.insert(reference, (committee, mode));
        state.current = reference;
    }
}

impl CommitteeResolver for Committees {
    fn current(&self) -> Option<Digest> {
        Some(self.state.lock().unwrap().current)
    }

    fn committee(&self, reference: &Digest) -> Option<Vec<Validator>> {
        self.state
            .lock()
            .unwrap()
            .committees
            .get(reference)
            .map(|(committee, _)| committee.clone())
    }

    fn mode(&self, reference: &Digest) -> SigningMode {
        self.state
            .lock()
            .unwrap()
            .committees
            .get(reference)
            .map_or(SigningMode::Whole, |(_, mode)| *mode)
    }
}
