//! # Response classification
//!
//! The peripheral terminates each reply by one of a few literals, but those arrive interleaved
//! with echoed command text and informational lines. [Matcher] consumes the byte stream one byte
//! at a time and tracks all literals of a [PatternTable] simultaneously. The first literal which
//! is fully matched decides the [ResponseKind].
//!
//! The table is compiled to a trie with failure links (Aho-Corasick), so a failed partial match
//! never loses bytes which start another match (e.g. `OOK` still yields `OK`).
//!
//! Every wait is bounded twice: by the timer budget and by a maximum number of poll iterations.
//! Exceeding either one yields [ResponseKind::Timeout]. The read position of the channel is
//! undefined afterwards.
use crate::channel::ByteChannel;
use crate::responses::{ResponseKind, CATALOGUE, CATALOGUE_STATES};
use crate::Error;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::{Deque, Vec};

/// Index of the root state
const ROOT: u16 = 0;

/// Automaton states of single literal tables, root included
pub const LITERAL_STATES: usize = 16;

/// Table of all catalogued terminal responses
pub type Catalogue = PatternTable<CATALOGUE_STATES>;

/// Errors when compiling a pattern table
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternError {
    /// A literal is empty
    EmptyPattern,

    /// The same literal is registered twice
    DuplicatePattern,

    /// A literal is contained in another one at a position other than its end, so the shorter
    /// one would complete while the longer one is still in progress
    AmbiguousPattern,

    /// The literals need more states than the table capacity
    CapacityExceeded,
}

#[derive(Copy, Clone, Debug)]
struct Node {
    /// Byte of the edge from the parent
    byte: u8,

    /// First child, children are chained by `next_sibling`
    first_child: Option<u16>,

    next_sibling: Option<u16>,

    /// Longest proper suffix of this state which is also a state
    fail: u16,

    /// Nearest state on the failure chain which completes a literal
    dictionary: Option<u16>,

    /// Set if a literal ends at this state
    output: Option<ResponseKind>,
}

impl Node {
    fn new(byte: u8) -> Self {
        Self {
            byte,
            first_child: None,
            next_sibling: None,
            fail: ROOT,
            dictionary: None,
            output: None,
        }
    }
}

/// Validated, immutable set of (literal, [ResponseKind]) pairs compiled to an automaton
///
/// N: Max. number of automaton states (root + one state per distinct literal prefix)
#[derive(Clone, Debug)]
pub struct PatternTable<const N: usize> {
    nodes: Vec<Node, N>,
}

/// Current progress of a single classification
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchState {
    state: u16,
}

impl PatternTable<CATALOGUE_STATES> {
    /// Compiles the table of all terminal responses
    pub fn catalogue() -> Result<Self, PatternError> {
        Self::new(&CATALOGUE)
    }
}

impl<const N: usize> PatternTable<N> {
    /// Validates the given literals and compiles the table
    pub fn new(patterns: &[(&[u8], ResponseKind)]) -> Result<Self, PatternError> {
        Self::validate(patterns)?;

        let mut table = Self { nodes: Vec::new() };
        table.push_node(Node::new(0))?;

        for (literal, kind) in patterns {
            table.insert(literal, *kind)?;
        }

        table.link()?;
        Ok(table)
    }

    /// Table matching just the given literal
    pub fn single(literal: &[u8], kind: ResponseKind) -> Result<Self, PatternError> {
        Self::new(&[(literal, kind)])
    }

    /// Initial state for a new classification
    pub fn start(&self) -> MatchState {
        MatchState { state: ROOT }
    }

    /// Advances the given state by one byte. Returns the response kind if a literal is completed.
    ///
    /// If multiple literals complete on the same byte (one being a suffix of the other), the longer
    /// literal wins.
    pub fn advance(&self, state: &mut MatchState, byte: u8) -> Option<ResponseKind> {
        state.state = self.next_state(state.state, byte);

        let node = &self.nodes[state.state as usize];
        if node.output.is_some() {
            return node.output;
        }

        node.dictionary.and_then(|index| self.nodes[index as usize].output)
    }

    /// Returns the number of automaton states in use
    pub fn states(&self) -> usize {
        self.nodes.len()
    }

    fn validate(patterns: &[(&[u8], ResponseKind)]) -> Result<(), PatternError> {
        for (index, (literal, _)) in patterns.iter().enumerate() {
            if literal.is_empty() {
                return Err(PatternError::EmptyPattern);
            }

            for (other_index, (other, _)) in patterns.iter().enumerate() {
                if index == other_index {
                    continue;
                }

                if literal == other {
                    return Err(PatternError::DuplicatePattern);
                }

                // Occurrence ending before the last byte of the other literal
                if literal.len() < other.len() && contains(&other[..other.len() - 1], literal) {
                    return Err(PatternError::AmbiguousPattern);
                }
            }
        }

        Ok(())
    }

    fn insert(&mut self, literal: &[u8], kind: ResponseKind) -> Result<(), PatternError> {
        let mut state = ROOT;

        for byte in literal {
            state = match self.child(state, *byte) {
                Some(child) => child,
                None => self.add_child(state, *byte)?,
            };
        }

        self.nodes[state as usize].output = Some(kind);
        Ok(())
    }

    /// Computes failure and dictionary links in breadth-first order
    fn link(&mut self) -> Result<(), PatternError> {
        let mut queue: Deque<u16, N> = Deque::new();

        let mut child = self.nodes[ROOT as usize].first_child;
        while let Some(index) = child {
            self.nodes[index as usize].fail = ROOT;
            queue.push_back(index).map_err(|_| PatternError::CapacityExceeded)?;
            child = self.nodes[index as usize].next_sibling;
        }

        while let Some(parent) = queue.pop_front() {
            let mut child = self.nodes[parent as usize].first_child;

            while let Some(index) = child {
                let byte = self.nodes[index as usize].byte;
                let fail = self.next_state(self.nodes[parent as usize].fail, byte);

                self.nodes[index as usize].fail = fail;
                self.nodes[index as usize].dictionary = match self.nodes[fail as usize].output {
                    Some(_) => Some(fail),
                    None => self.nodes[fail as usize].dictionary,
                };

                queue.push_back(index).map_err(|_| PatternError::CapacityExceeded)?;
                child = self.nodes[index as usize].next_sibling;
            }
        }

        Ok(())
    }

    fn next_state(&self, mut state: u16, byte: u8) -> u16 {
        loop {
            if let Some(child) = self.child(state, byte) {
                return child;
            }

            if state == ROOT {
                return ROOT;
            }

            state = self.nodes[state as usize].fail;
        }
    }

    fn child(&self, state: u16, byte: u8) -> Option<u16> {
        let mut child = self.nodes[state as usize].first_child;

        while let Some(index) = child {
            if self.nodes[index as usize].byte == byte {
                return Some(index);
            }
            child = self.nodes[index as usize].next_sibling;
        }

        None
    }

    fn add_child(&mut self, parent: u16, byte: u8) -> Result<u16, PatternError> {
        let mut node = Node::new(byte);
        node.next_sibling = self.nodes[parent as usize].first_child;

        let index = self.push_node(node)?;
        self.nodes[parent as usize].first_child = Some(index);
        Ok(index)
    }

    fn push_node(&mut self, node: Node) -> Result<u16, PatternError> {
        let index = u16::try_from(self.nodes.len()).map_err(|_| PatternError::CapacityExceeded)?;
        self.nodes.push(node).map_err(|_| PatternError::CapacityExceeded)?;
        Ok(index)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Consumes channel bytes until a terminal response is recognized or the budget is exhausted
pub struct Matcher<'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    channel: &'a mut C,

    /// Timer used for timeout measurement
    timer: &'a mut T,

    /// Budget of a single wait
    timeout: TimerDurationU32<TIMER_HZ>,

    /// Max. loop iterations of a single wait
    max_polls: u32,

    /// Loop iterations since the last call of `begin()`
    polls: u32,
}

impl<'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Matcher<'a, C, T, TIMER_HZ> {
    pub fn new(channel: &'a mut C, timer: &'a mut T, timeout: TimerDurationU32<TIMER_HZ>, max_polls: u32) -> Self {
        Self {
            channel,
            timer,
            timeout,
            max_polls,
            polls: 0,
        }
    }

    /// Reads bytes until a literal of the given table is completed
    pub fn classify<const N: usize>(&mut self, table: &PatternTable<N>) -> Result<ResponseKind, Error> {
        match self.scan(table, None)? {
            Scan::Matched(kind, consumed) => {
                debug!("Classified response {:?} after {:?} bytes", kind, consumed);
                Ok(kind)
            }
            Scan::Timeout | Scan::LimitReached => {
                warn!("No terminal response within timeout budget");
                Ok(ResponseKind::Timeout)
            }
        }
    }

    /// Reads bytes until the given literal was received.
    /// Returns the number of bytes consumed (literal included), or None on timeout.
    pub fn wait_for(&mut self, literal: &[u8]) -> Result<Option<usize>, Error> {
        let table: PatternTable<LITERAL_STATES> = PatternTable::single(literal, ResponseKind::Ok)?;

        match self.scan(&table, None)? {
            Scan::Matched(_, consumed) => Ok(Some(consumed)),
            _ => Ok(None),
        }
    }

    /// Like `wait_for()`, but gives up after `limit` bytes without match
    pub(crate) fn wait_for_within(&mut self, literal: &[u8], limit: usize) -> Result<Within, Error> {
        let table: PatternTable<LITERAL_STATES> = PatternTable::single(literal, ResponseKind::Ok)?;

        Ok(match self.scan(&table, Some(limit))? {
            Scan::Matched(_, consumed) => Within::Found(consumed),
            Scan::LimitReached => Within::NotFound,
            Scan::Timeout => Within::Timeout,
        })
    }

    /// Reads bytes until the given byte was received. Returns false on timeout.
    pub fn wait_for_byte(&mut self, expected: u8) -> Result<bool, Error> {
        self.begin()?;

        while let Some(byte) = self.next_byte()? {
            if byte == expected {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Starts a new wait: restarts the timer and resets the poll count
    pub(crate) fn begin(&mut self) -> Result<(), Error> {
        self.polls = 0;
        self.timer.start(self.timeout).map_err(|_| Error::Timer)
    }

    /// Returns the next byte, or None if the timer expired or the poll limit was reached
    pub(crate) fn next_byte(&mut self) -> Result<Option<u8>, Error> {
        loop {
            match self.timer.wait() {
                Ok(_) => return Ok(None),
                Err(nb::Error::Other(_)) => return Err(Error::Timer),
                Err(nb::Error::WouldBlock) => {}
            }

            if self.polls >= self.max_polls {
                return Ok(None);
            }
            self.polls += 1;

            match self.channel.receive_byte() {
                Ok(byte) => return Ok(Some(byte)),
                Err(nb::Error::Other(error)) => return Err(error),
                Err(nb::Error::WouldBlock) => {}
            }
        }
    }

    fn scan<const N: usize>(&mut self, table: &PatternTable<N>, limit: Option<usize>) -> Result<Scan, Error> {
        self.begin()?;

        let mut state = table.start();
        let mut consumed = 0;

        loop {
            if limit.is_some_and(|limit| consumed >= limit) {
                return Ok(Scan::LimitReached);
            }

            let byte = match self.next_byte()? {
                None => return Ok(Scan::Timeout),
                Some(byte) => byte,
            };
            consumed += 1;

            if let Some(kind) = table.advance(&mut state, byte) {
                return Ok(Scan::Matched(kind, consumed));
            }
        }
    }
}

/// Result of a bounded literal wait
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Within {
    /// Literal found after the given number of bytes
    Found(usize),

    /// Byte limit reached without match
    NotFound,

    Timeout,
}

enum Scan {
    Matched(ResponseKind, usize),
    Timeout,
    LimitReached,
}
