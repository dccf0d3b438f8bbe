#![allow(clippy::expect_used)]
use std::collections::HashMap;
use std::thread;

use chatterm_core::work_queue::MutationTarget;
use chatterm_core::work_queue::work_queue;
use pretty_assertions::assert_eq;

const PRODUCERS: usize = 8;
const ITEMS_PER_PRODUCER: usize = 500;

#[derive(Default)]
struct Applied {
    seen: Vec<(usize, usize)>,
    errors: Vec<String>,
}

impl MutationTarget for Applied {
    fn report_mutation_error(&mut self, message: String) {
        self.errors.push(message);
    }
}

#[test]
fn concurrent_producers_are_applied_once_and_in_order() {
    let (tx, queue) = work_queue::<Applied>();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let tx = tx.clone();
            thread::spawn(move || {
                for seq in 0..ITEMS_PER_PRODUCER {
                    tx.submit(move |state: &mut Applied| {
                        state.seen.push((producer, seq));
                        Ok(())
                    });
                }
            })
        })
        .collect();
    drop(tx);

    let mut state = Applied::default();
    // Returns once every producer has finished and dropped its sender.
    queue.run_loop(&mut state);
    for p in producers {
        p.join().expect("producer panicked");
    }

    assert_eq!(state.seen.len(), PRODUCERS * ITEMS_PER_PRODUCER);
    assert!(state.errors.is_empty());

    let mut per_producer: HashMap<usize, Vec<usize>> = HashMap::new();
    for (producer, seq) in state.seen {
        per_producer.entry(producer).or_default().push(seq);
    }
    assert_eq!(per_producer.len(), PRODUCERS);
    let expected: Vec<usize> = (0..ITEMS_PER_PRODUCER).collect();
    for (producer, seqs) in per_producer {
        assert_eq!(seqs, expected, "producer {producer} out of order");
    }
}

#[test]
fn one_bad_mutation_among_many_producers() {
    let (tx, queue) = work_queue::<Applied>();
    let bad = {
        let tx = tx.clone();
        thread::spawn(move || {
            tx.submit(|_: &mut Applied| Err(anyhow::anyhow!("lost connection")));
            tx.submit(|_: &mut Applied| panic!("index out of range"));
        })
    };
    let good = {
        let tx = tx.clone();
        thread::spawn(move || {
            for seq in 0..10 {
                tx.submit(move |state: &mut Applied| {
                    state.seen.push((0, seq));
                    Ok(())
                });
            }
        })
    };
    drop(tx);

    let mut state = Applied::default();
    queue.run_loop(&mut state);
    bad.join().expect("bad producer");
    good.join().expect("good producer");

    assert_eq!(state.seen.len(), 10);
    let mut errors = state.errors;
    errors.sort();
    assert_eq!(
        errors,
        vec![
            "Error: lost connection".to_string(),
            "Internal error: index out of range".to_string(),
        ]
    );
}
