use rand::Rng;

/// Anything stored in a [`Registry`] is identified by one integer key.
pub trait Keyed {
    type Key: Ord + Copy;

    fn key(&self) -> Self::Key;
}

/// Identifier-sorted collection backing every record family.
///
/// The backing vector is ascending by key whenever a method returns, so
/// lookups can binary search. Keys are expected to be unique; `insert`
/// does not check, the identifier allocator guarantees it.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: Vec<T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends and re-sorts the whole sequence.
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        quick_sort(&mut self.items, &mut rand::thread_rng());
    }

    pub fn find(&self, key: T::Key) -> Option<&T> {
        self.position(key).map(|idx| &self.items[idx])
    }

    pub fn find_mut(&mut self, key: T::Key) -> Option<&mut T> {
        self.position(key).map(move |idx| &mut self.items[idx])
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.position(key).is_some()
    }

    /// Removing from a sorted vector keeps it sorted.
    pub fn remove(&mut self, key: T::Key) -> Option<T> {
        self.position(key).map(|idx| self.items.remove(idx))
    }

    pub fn keys(&self) -> impl Iterator<Item = T::Key> + '_ {
        self.items.iter().map(|item| item.key())
    }

    fn position(&self, key: T::Key) -> Option<usize> {
        let mut low = 0usize;
        let mut high = self.items.len();
        while low < high {
            let mid = low + (high - low) / 2;
            let mid_key = self.items[mid].key();
            if mid_key == key {
                return Some(mid);
            } else if mid_key < key {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        None
    }
}

impl<T> Registry<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Randomized-pivot quicksort with a Lomuto partition.
///
/// Recurses into the smaller half and loops on the larger one so the stack
/// stays logarithmic even on unlucky pivots.
pub fn quick_sort<T: Keyed, R: Rng + ?Sized>(mut items: &mut [T], rng: &mut R) {
    while items.len() > 1 {
        let pivot = partition_random_pivot(items, &mut *rng);
        let (left, rest) = std::mem::take(&mut items).split_at_mut(pivot);
        let right = &mut rest[1..];
        if left.len() < right.len() {
            quick_sort(left, &mut *rng);
            items = right;
        } else {
            quick_sort(right, &mut *rng);
            items = left;
        }
    }
}

fn partition_random_pivot<T: Keyed, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) -> usize {
    let high = items.len() - 1;
    let pivot = rng.gen_range(0..=high);
    items.swap(pivot, high);
    partition(items)
}

fn partition<T: Keyed>(items: &mut [T]) -> usize {
    let high = items.len() - 1;
    let pivot_key = items[high].key();
    let mut store = 0usize;
    for j in 0..high {
        if items[j].key() < pivot_key {
            items.swap(store, j);
            store += 1;
        }
    }
    items.swap(store, high);
    store
}
