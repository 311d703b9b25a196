//! Depth-first ancestor traversal with O(1) visited resets.
//!
//! Each search bumps a counter and stamps visited events with it, so marks
//! left by earlier searches become stale without touching them. An
//! [`Ancestors`] iterator holds a mutable borrow of both the search and the
//! arena for as long as it lives. Running two traversals over the same
//! arena at once would corrupt both, and the borrow makes that impossible to
//! write.

use weft_types::ConsensusTime;

use crate::graph::{EventArena, EventId, EventNode};

/// Owner of the visited-mark counter.
#[derive(Debug, Default)]
pub struct AncestorSearch {
    mark: u64,
}

struct Frame {
    id: EventId,
    state: u8,
    self_ancestor: bool,
    time: ConsensusTime,
}

/// Lazy, single-use sequence of `(event, time reached)` pairs.
///
/// Yields every ancestor of the root reachable through events accepted by
/// `valid`, each parent before its child, with the root last. The self-parent
/// branch is explored before the other-parent branch, so an event reachable
/// along several paths is first reached along the one that stays on the
/// root's self-ancestor chain longest. The time paired with an event is the
/// creation time of the root's self-ancestor from which the search stepped
/// down to it (the root's own creation time for the root).
pub struct Ancestors<'a, F> {
    arena: &'a mut EventArena,
    mark: u64,
    valid: F,
    curr: EventId,
    state: u8,
    self_ancestor: bool,
    time: ConsensusTime,
    stack: Vec<Frame>,
    done: bool,
}

/// Result of [`AncestorSearch::common_ancestors_of`].
#[derive(Debug, Default)]
pub struct CommonAncestors {
    /// Events reached from every root, in the order they became common.
    pub common: Vec<EventId>,
    /// Every event that had a received time recorded.
    pub visited: Vec<EventId>,
}

impl AncestorSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a traversal from `root`. The root itself is not tested against
    /// `valid`. A root missing from the arena yields nothing.
    pub fn search<'a, F>(
        &'a mut self,
        arena: &'a mut EventArena,
        root: EventId,
        valid: F,
    ) -> Ancestors<'a, F>
    where
        F: FnMut(&EventNode) -> bool,
    {
        self.mark += 1;
        let (time, done) = match arena.get(root) {
            Some(node) => (node.time_created(), false),
            None => (ConsensusTime::EPOCH, true),
        };
        Ancestors {
            arena,
            mark: self.mark,
            valid,
            curr: root,
            state: 0,
            self_ancestor: true,
            time,
            stack: Vec::new(),
            done,
        }
    }

    /// Record, on every valid ancestor of each root, the time the search from
    /// that root reached it; events reached from all roots are common.
    ///
    /// Received-time lists on visited events are sorted ascending before
    /// returning. They are left in place for the caller, which must clear
    /// them (see [`clear_rec_times`]) once it is done with them.
    pub fn common_ancestors_of<F>(
        &mut self,
        arena: &mut EventArena,
        roots: &[EventId],
        mut valid: F,
    ) -> CommonAncestors
    where
        F: FnMut(&EventNode) -> bool,
    {
        let mut result = CommonAncestors::default();
        for &root in roots {
            let mut ancestors = self.search(arena, root, &mut valid);
            while let Some((id, time)) = ancestors.next() {
                let (arena, valid) = ancestors.parts();
                let Some(node) = arena.get_mut(id) else {
                    continue;
                };
                // only the root can reach here without passing the predicate
                if id == root && !valid(node) {
                    continue;
                }
                if node.rec_times.is_empty() {
                    result.visited.push(id);
                }
                node.rec_times.push(time);
                if node.rec_times.len() == roots.len() {
                    result.common.push(id);
                }
            }
        }
        for &id in &result.visited {
            if let Some(node) = arena.get_mut(id) {
                node.rec_times.sort();
            }
        }
        result
    }
}

/// Release the received-time lists left behind by a common-ancestor search.
pub fn clear_rec_times(arena: &mut EventArena, visited: &[EventId]) {
    for &id in visited {
        if let Some(node) = arena.get_mut(id) {
            node.rec_times = Vec::new();
        }
    }
}

impl<'a, F> Ancestors<'a, F>
where
    F: FnMut(&EventNode) -> bool,
{
    /// The arena and predicate, for callers that annotate yielded events.
    fn parts(&mut self) -> (&mut EventArena, &mut F) {
        (self.arena, &mut self.valid)
    }

    /// Whether the search should descend into `parent`.
    fn enter(&mut self, parent: Option<EventId>) -> Option<EventId> {
        let id = parent?;
        let node = self.arena.get(id)?;
        if node.mark == self.mark || !(self.valid)(node) {
            return None;
        }
        Some(id)
    }

    fn push(&mut self, next: EventId, resume_state: u8) {
        self.stack.push(Frame {
            id: self.curr,
            state: resume_state,
            self_ancestor: self.self_ancestor,
            time: self.time,
        });
        self.curr = next;
        self.state = 0;
    }
}

impl<'a, F> Iterator for Ancestors<'a, F>
where
    F: FnMut(&EventNode) -> bool,
{
    type Item = (EventId, ConsensusTime);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (self_parent, other_parent) = match self.arena.get_mut(self.curr) {
                Some(node) => {
                    node.mark = self.mark;
                    (node.self_parent, node.other_parent)
                }
                // the event under the cursor was validated on entry
                None => {
                    self.done = true;
                    return None;
                }
            };
            match self.state {
                0 => {
                    self.state = 1;
                    if let Some(parent) = self.enter(self_parent) {
                        self.push(parent, 1);
                        if self.self_ancestor {
                            if let Some(node) = self.arena.get(parent) {
                                self.time = node.time_created();
                            }
                        }
                    }
                }
                1 => {
                    self.state = 2;
                    if let Some(parent) = self.enter(other_parent) {
                        self.push(parent, 2);
                        self.self_ancestor = false;
                    }
                }
                _ => {
                    let yielded = self.curr;
                    match self.stack.pop() {
                        Some(frame) => {
                            self.curr = frame.id;
                            self.state = frame.state;
                            self.self_ancestor = frame.self_ancestor;
                            self.time = frame.time;
                        }
                        None => self.done = true,
                    }
                    return Some((yielded, self.time));
                }
            }
        }
    }
}
