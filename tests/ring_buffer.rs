use tamon::ring::RingBuffer;

#[test]
fn retains_the_most_recent_pushes() {
    for capacity in [1usize, 2, 5] {
        for pushes in 0..12usize {
            let mut ring = RingBuffer::new(capacity);
            for value in 0..pushes {
                ring.push(value);
            }
            assert_eq!(ring.len(), pushes.min(capacity), "capacity {capacity}, pushes {pushes}");
            if pushes > 0 {
                assert_eq!(ring.recent(0), Some(&(pushes - 1)));
                assert_eq!(ring.back(), Some(&(pushes - 1)));
            } else {
                assert!(ring.is_empty());
                assert_eq!(ring.recent(0), None);
            }
        }
    }
}

#[test]
fn iterates_oldest_first() {
    let mut ring = RingBuffer::new(3);
    for value in [10, 20, 30, 40] {
        ring.push(value);
    }
    let values: Vec<i32> = ring.iter().copied().collect();
    assert_eq!(values, vec![20, 30, 40]);
    assert_eq!(ring.front(), Some(&20));
    assert_eq!(ring.get(1), Some(&30));
    assert_eq!(ring.get(3), None);
    assert_eq!(ring.recent(2), Some(&20));
    assert_eq!(ring.recent(3), None);
}

#[test]
fn pops_from_both_ends() {
    let mut ring = RingBuffer::new(3);
    for value in 1..=5 {
        ring.push(value);
    }
    assert_eq!(ring.pop_front(), Some(3));
    assert_eq!(ring.pop_back(), Some(5));
    assert_eq!(ring.len(), 1);
    ring.push(6);
    ring.push(7);
    ring.push(8);
    assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![6, 7, 8]);
    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(ring.pop_back(), None);
}

#[test]
fn orders_lexicographically() {
    let mut shorter = RingBuffer::new(4);
    shorter.push(1);
    shorter.push(2);
    let mut longer = RingBuffer::new(4);
    longer.push(1);
    longer.push(2);
    longer.push(0);
    let mut larger = RingBuffer::new(4);
    larger.push(1);
    larger.push(3);
    assert!(shorter < longer);
    assert!(longer < larger);
    assert!(shorter < larger);
}

#[test]
fn replaces_the_newest_in_place() {
    let mut ring = RingBuffer::new(2);
    ring.push(1);
    ring.push(2);
    if let Some(newest) = ring.back_mut() {
        *newest = 9;
    }
    assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 9]);
}
