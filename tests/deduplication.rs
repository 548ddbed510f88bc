use std::sync::Arc;

use tamon::clock::{Retention, Trace};
use tamon::token::{Token, TokenPool};
use tamon::truth::Substitutions;
use tamon::{Degree, Monitor, MonitorOptions, Snapshot, Table};

fn token(mode: u32, env: u64, sys: u64) -> Token<bool> {
    let clocks = vec![Trace::new(Retention::Latest), Trace::new(Retention::Latest)];
    Token::new(mode, clocks).aged(env, sys)
}

fn setup(deduplicate: bool) -> Monitor<bool> {
    let table = Table::parse(
        "automaton Twice {
            clock t;
            initial a;
            a -> a when x;
            a -> a when y;
        }",
    )
    .expect("parses");
    let options = MonitorOptions {
        deduplicate,
        ..MonitorOptions::default()
    };
    Monitor::new(Arc::new(table), options, Substitutions::new())
}

// every permutation of a small slice, by Heap's algorithm
fn permutations(items: &mut Vec<Token<bool>>, k: usize, out: &mut Vec<Vec<Token<bool>>>) {
    if k <= 1 {
        out.push(items.clone());
        return;
    }
    for i in 0..k {
        permutations(items, k - 1, out);
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
}

#[test]
fn merging_is_order_independent() {
    let mut tokens = vec![
        token(0, 10, 1),
        token(1, 10, 1),
        token(0, 10, 1),
        token(0, 3, 0),
        token(1, 10, 1),
    ];
    let mut orders = Vec::new();
    permutations(&mut tokens, 5, &mut orders);
    assert_eq!(orders.len(), 120);
    let mut merged = Vec::new();
    for order in orders {
        let mut pool = TokenPool::new(true);
        for token in order {
            pool.insert(token);
        }
        merged.push(pool.into_vec());
    }
    assert_eq!(merged[0].len(), 3);
    assert!(merged.iter().all(|tokens| *tokens == merged[0]));
}

#[test]
fn sequence_pool_keeps_every_branch() {
    let mut pool = TokenPool::new(false);
    pool.insert(token(0, 1, 1));
    pool.insert(token(0, 1, 1));
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.into_vec().len(), 2);
}

#[test]
fn reconverging_branches_collapse() {
    let both = Snapshot::new().with("x", 1).with("y", 1);
    let mut merged = setup(true);
    let mut kept = setup(false);
    for _ in 0..3 {
        merged.advance(5, 0);
        merged.step(both.clone()).expect("step");
        kept.advance(5, 0);
        kept.step(both.clone()).expect("step");
    }
    assert_eq!(merged.tokens().len(), 1);
    assert_eq!(kept.tokens().len(), 8);
}

#[test]
fn degrees_separate_quantitative_tokens_only() {
    let clocks = vec![Trace::new(Retention::Latest)];
    let crisp_a: Token<bool> = Token::new(0, clocks.clone());
    let crisp_b: Token<bool> = Token::new(0, clocks.clone());
    assert_eq!(crisp_a, crisp_b);

    let mut pool = TokenPool::<Degree>::new(true);
    pool.insert(Token::new(0, clocks.clone()));
    pool.insert(Token::new(0, clocks));
    assert_eq!(pool.len(), 1);
}
