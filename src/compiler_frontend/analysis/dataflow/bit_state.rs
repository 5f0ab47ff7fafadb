/// Growable fixed-word bitset indexed by slot.
/// Bits past the stored length read as zero.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

// Trailing zero words are not significant.
impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        (0..len).all(|index| {
            self.words.get(index).copied().unwrap_or(0)
                == other.words.get(index).copied().unwrap_or(0)
        })
    }
}

impl Eq for BitSet {}

impl BitSet {
    pub fn empty() -> Self {
        Self { words: Vec::new() }
    }

    pub fn insert(&mut self, bit_index: usize) {
        let (word_index, bit_offset) = Self::position(bit_index);
        self.ensure_words(word_index + 1);
        self.words[word_index] |= 1u64 << bit_offset;
    }

    pub fn remove(&mut self, bit_index: usize) {
        let (word_index, bit_offset) = Self::position(bit_index);
        if let Some(word) = self.words.get_mut(word_index) {
            *word &= !(1u64 << bit_offset);
        }
    }

    pub fn contains(&self, bit_index: usize) -> bool {
        let (word_index, bit_offset) = Self::position(bit_index);
        self.words
            .get(word_index)
            .is_some_and(|word| (word & (1u64 << bit_offset)) != 0)
    }

    /// Sets every bit in `0..bit_len`.
    pub fn fill_to(&mut self, bit_len: usize) {
        let full_words = bit_len / 64;
        self.ensure_words(bit_len.div_ceil(64));
        for word in &mut self.words[..full_words] {
            *word = u64::MAX;
        }
        let remainder = bit_len % 64;
        if remainder != 0 {
            self.words[full_words] |= (1u64 << remainder) - 1;
        }
    }

    /// Clears every bit at or above `from`.
    pub fn clear_from(&mut self, from: usize) {
        let (word_index, bit_offset) = Self::position(from);
        if word_index >= self.words.len() {
            return;
        }
        self.words[word_index] &= (1u64 << bit_offset) - 1;
        for word in &mut self.words[word_index + 1..] {
            *word = 0;
        }
    }

    pub fn intersect_with(&mut self, other: &Self) {
        for (index, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(index).copied().unwrap_or(0);
        }
    }

    /// self &= !other
    pub fn subtract(&mut self, other: &Self) {
        for (left, right) in self.words.iter_mut().zip(other.words.iter()) {
            *left &= !*right;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn iter_ones(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_index: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }

    fn position(bit_index: usize) -> (usize, usize) {
        (bit_index / 64, bit_index % 64)
    }

    fn ensure_words(&mut self, word_len: usize) {
        if self.words.len() < word_len {
            self.words.resize(word_len, 0);
        }
    }
}

pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_index: usize,
    current_word: u64,
}

impl<'a> Iterator for BitSetIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.word_index >= self.set.words.len() {
                return None;
            }

            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(self.word_index * 64 + trailing);
            }

            self.word_index += 1;
            if self.word_index < self.set.words.len() {
                self.current_word = self.set.words[self.word_index];
            }
        }
    }
}

/// The DA/DU pair for every slot.
///
/// After `init` a slot is DU and not DA. A real assignment flips it to DA and not DU.
/// Dead state (both set) only comes from `mark_dead` and absorbs under `merge`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowBits {
    da: BitSet,
    du: BitSet,
}

impl FlowBits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, slot: usize) {
        self.da.remove(slot);
        self.du.insert(slot);
    }

    pub fn mark(&mut self, slot: usize) {
        self.da.insert(slot);
        self.du.remove(slot);
    }

    pub fn is_da(&self, slot: usize) -> bool {
        self.da.contains(slot)
    }

    pub fn is_du(&self, slot: usize) -> bool {
        self.du.contains(slot)
    }

    /// Both bits set for every slot below `slot_count`.
    pub fn mark_dead(&mut self, slot_count: usize) {
        self.da.fill_to(slot_count);
        self.du.fill_to(slot_count);
    }

    /// A fact survives a join only when it held on both incoming paths.
    pub fn merge(&mut self, other: &Self) {
        self.da.intersect_with(&other.da);
        self.du.intersect_with(&other.du);
    }

    /// Drops every bit at or above `from`, for slots that went out of scope.
    pub fn clear_from(&mut self, from: usize) {
        self.da.clear_from(from);
        self.du.clear_from(from);
    }

    pub fn clear_du(&mut self, other: &Self) {
        self.du.subtract(&other.du);
    }

    pub fn du_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.du.iter_ones()
    }
}
