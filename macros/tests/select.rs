#[cfg(test)]
mod tests {
    use futures::{channel::mpsc, executor::block_on, future, SinkExt, StreamExt};
    use shardbft_macros::select;

    #[test]
    fn test_select_ready_branch() {
        block_on(async move {
            let (mut tx, mut rx) = mpsc::unbounded();
            tx.send(7u64).await.unwrap();

            let value = select! {
                _ = future::pending::<()>() => {
                    unreachable!("pending future completed")
                },
                msg = rx.next() => {
                    msg.unwrap()
                },
            };
            assert_eq!(value, 7);
        });
    }

    #[test]
    fn test_select_biased_order() {
        block_on(async move {
            // Both branches are ready, so the first listed wins
            let winner = select! {
                a = future::ready(1) => { a },
                b = future::ready(2) => { b },
            };
            assert_eq!(winner, 1);
        });
    }

    #[test]
    fn test_select_in_loop() {
        block_on(async move {
            let (mut tx, mut rx) = mpsc::unbounded();
            for i in 0..3 {
                tx.send(i).await.unwrap();
            }
            drop(tx);

            let mut received = Vec::new();
            loop {
                select! {
                    msg = rx.next() => {
                        match msg {
                            Some(msg) => received.push(msg),
                            None => break,
                        }
                    },
                }
            }
            assert_eq!(received, vec![0, 1, 2]);
        });
    }
}
