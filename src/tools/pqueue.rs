//! Priority queue for optimal merge ordering
//!
//! Binary min-heap stored densely in a `Vec`, the children of slot `i` are
//! in slots `2i+1` and `2i+2`.  Ordering comes from a `Compare` object supplied
//! by the owner, so "minimum" means whatever the comparator says comes first.

use crate::Error;

/// Strict weak ordering, `less(a,b)` is true if `a` should come out before `b`.
pub trait Compare<T> {
    fn less(&self,a: &T,b: &T) -> bool;
}

/// smallest first, for any `Ord` type
#[derive(Clone,Copy,Default,Debug)]
pub struct Less;

/// largest first, for any `Ord` type
#[derive(Clone,Copy,Default,Debug)]
pub struct Greater;

impl <T: Ord> Compare<T> for Less {
    fn less(&self,a: &T,b: &T) -> bool {
        a < b
    }
}

impl <T: Ord> Compare<T> for Greater {
    fn less(&self,a: &T,b: &T) -> bool {
        a > b
    }
}

impl <T,F> Compare<T> for F where F: Fn(&T,&T) -> bool {
    fn less(&self,a: &T,b: &T) -> bool {
        self(a,b)
    }
}

pub struct PriorityQueue<T,C = Less> {
    items: Vec<T>,
    cmp: C
}

impl <T: Ord> PriorityQueue<T,Less> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cmp: Less
        }
    }
}

impl <T: Ord> Default for PriorityQueue<T,Less> {
    fn default() -> Self {
        Self::new()
    }
}

impl <T,C: Compare<T>> PriorityQueue<T,C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            items: Vec::new(),
            cmp
        }
    }
    pub fn size(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// the element that would be popped next
    pub fn top(&self) -> Result<&T,Error> {
        self.items.first().ok_or(Error::Underflow)
    }
    pub fn push(&mut self,item: T) {
        self.items.push(item);
        self.percolate_up(self.items.len() - 1);
    }
    /// Remove and return the top element.
    /// The last element takes over the root slot and sinks to where it belongs.
    pub fn pop(&mut self) -> Result<T,Error> {
        if self.items.is_empty() {
            return Err(Error::Underflow);
        }
        let ans = self.items.swap_remove(0);
        self.percolate_down(0);
        Ok(ans)
    }
    fn precedes(&self,i: usize,j: usize) -> bool {
        self.cmp.less(&self.items[i],&self.items[j])
    }
    fn percolate_up(&mut self,mut n: usize) {
        while n > 0 {
            let parent = (n - 1) / 2;
            if !self.precedes(n,parent) {
                break;
            }
            self.items.swap(n,parent);
            n = parent;
        }
    }
    fn percolate_down(&mut self,mut n: usize) {
        let len = self.items.len();
        loop {
            let left = 2*n + 1;
            let right = left + 1;
            if left >= len {
                break;
            }
            // left child wins ties
            let child = match right < len && self.precedes(right,left) {
                true => right,
                false => left
            };
            if !self.precedes(child,n) {
                break;
            }
            self.items.swap(child,n);
            n = child;
        }
    }
}

#[cfg(test)]
#[derive(Debug,Clone,PartialEq)]
struct Item {
    n: i32,
    tag: char
}

#[test]
fn ascending() {
    let mut pq: PriorityQueue<i32> = PriorityQueue::new();
    for x in [42,23,2,34] {
        pq.push(x);
    }
    assert_eq!(*pq.top().unwrap(),2);
    assert_eq!(pq.size(),4);
    assert_eq!(pq.pop().unwrap(),2);
    assert_eq!(*pq.top().unwrap(),23);
    assert_eq!(pq.size(),3);
}

#[test]
fn descending() {
    let mut pq = PriorityQueue::with_comparator(Greater);
    for x in [42,23,2,34] {
        pq.push(x);
    }
    assert_eq!(*pq.top().unwrap(),42);
    assert_eq!(pq.size(),4);
    pq.pop().unwrap();
    assert_eq!(*pq.top().unwrap(),34);
}

#[test]
fn closure_comparator() {
    let mut pq: PriorityQueue<Item,_> = PriorityQueue::with_comparator(|a: &Item,b: &Item| a.tag < b.tag);
    for (n,tag) in [(42,'p'),(23,'c'),(2,'a'),(34,'m')] {
        pq.push(Item { n, tag });
    }
    assert_eq!(pq.top().unwrap().n,2);
    pq.pop().unwrap();
    assert_eq!(pq.top().unwrap().tag,'c');
    let rest: Vec<char> = std::iter::from_fn(|| pq.pop().ok()).map(|x| x.tag).collect();
    assert_eq!(rest,vec!['c','m','p']);
}

#[test]
fn underflow() {
    let mut pq: PriorityQueue<i32> = PriorityQueue::new();
    assert!(matches!(pq.top(),Err(Error::Underflow)));
    assert!(matches!(pq.pop(),Err(Error::Underflow)));
    pq.push(42);
    pq.push(23);
    pq.pop().unwrap();
    pq.pop().unwrap();
    assert!(pq.is_empty());
    assert!(matches!(pq.pop(),Err(Error::Underflow)));
    assert!(matches!(pq.top(),Err(Error::Underflow)));
}

#[test]
fn drains_in_order() {
    // deterministic scramble of 0..100 with repeats
    let vals: Vec<i32> = (0..200).map(|i| (i * 37 + 11) % 100).collect();
    let mut pq = PriorityQueue::new();
    let mut pushed = 0;
    let mut popped = 0;
    for (i,v) in vals.iter().enumerate() {
        pq.push(*v);
        pushed += 1;
        if i % 3 == 2 {
            pq.pop().unwrap();
            popped += 1;
        }
        assert_eq!(pq.size(),pushed - popped);
    }
    let mut prev = *pq.top().unwrap();
    while let Ok(x) = pq.pop() {
        assert!(prev <= x);
        prev = x;
    }
    assert_eq!(pq.size(),0);
}
