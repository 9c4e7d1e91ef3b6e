// ============================================================================
// LAYER STORES: per-cell composition policies
// ============================================================================

use crate::collections::{BoundedQueue, BoundedStack, SortedList};
use crate::layers::{Color, Layer, invert};

/// Maximum layers an additive or sequence store holds.
pub const DEFAULT_STORE_CAPACITY: usize = 2000;

/// Per-cell container of layers.
///
/// Every mutating operation reports whether the store actually changed.
/// Nothing here panics: a full store refuses the add and returns `false`.
pub trait LayerStore: Send + Sync {
    /// Add a layer. Returns `true` if the store changed.
    fn add(&mut self, layer: Layer) -> bool;

    /// Erase according to the store's policy. Returns `true` if the store changed.
    fn erase(&mut self, layer: Layer) -> bool;

    /// Colour this cell shows given `start`, composed through the held layers.
    fn get_color(&self, start: Color, timestamp: u64, x: usize, y: usize) -> Color;

    /// Store-specific special mode. Returns `true` if the store changed.
    fn special(&mut self) -> bool;

    /// Whether calling `special` twice restores the original state.
    fn special_is_self_inverse(&self) -> bool;

    /// Number of layers held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Held layers in the order they are composed.
    fn layers(&self) -> Vec<Layer>;
}

// ============================================================================
// SET: at most one layer, special inverts the output
// ============================================================================

/// Holds a single layer (or nothing).
///
/// - add: replace the held layer.
/// - erase: clear whatever is held, regardless of the argument.
/// - special: toggle colour inversion.
#[derive(Clone, Debug, Default)]
pub struct SetLayerStore {
    current: Option<Layer>,
    inverted: bool,
}

impl SetLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

impl LayerStore for SetLayerStore {
    fn add(&mut self, layer: Layer) -> bool {
        if self.current == Some(layer) {
            return false;
        }
        self.current = Some(layer);
        true
    }

    fn erase(&mut self, _layer: Layer) -> bool {
        self.current.take().is_some()
    }

    fn get_color(&self, start: Color, timestamp: u64, x: usize, y: usize) -> Color {
        let color = match self.current {
            Some(layer) => layer.apply(start, timestamp, x, y),
            None => start,
        };
        if self.inverted { invert(color) } else { color }
    }

    fn special(&mut self) -> bool {
        self.inverted = !self.inverted;
        true
    }

    fn special_is_self_inverse(&self) -> bool {
        true
    }

    fn len(&self) -> usize {
        usize::from(self.current.is_some())
    }

    fn layers(&self) -> Vec<Layer> {
        self.current.into_iter().collect()
    }
}

// ============================================================================
// ADDITIVE: bounded FIFO, special reverses the order
// ============================================================================

/// Applies layers in the order they were added.
///
/// - add: append to the back (refused when full).
/// - erase: drop the oldest layer, regardless of the argument.
/// - special: reverse the order of the held layers.
#[derive(Clone, Debug)]
pub struct AdditiveLayerStore {
    queue: BoundedQueue<Layer>,
}

impl Default for AdditiveLayerStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl AdditiveLayerStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: BoundedQueue::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl LayerStore for AdditiveLayerStore {
    fn add(&mut self, layer: Layer) -> bool {
        self.queue.append(layer)
    }

    fn erase(&mut self, _layer: Layer) -> bool {
        self.queue.serve().is_some()
    }

    fn get_color(&self, start: Color, timestamp: u64, x: usize, y: usize) -> Color {
        self.queue
            .iter()
            .fold(start, |color, layer| layer.apply(color, timestamp, x, y))
    }

    fn special(&mut self) -> bool {
        let size = self.queue.len();
        if size < 2 {
            return false;
        }
        // Drain into a stack (reverses once), then back into the queue.
        let mut reversed = BoundedStack::new(size);
        while let Some(layer) = self.queue.serve() {
            reversed.push(layer);
        }
        while let Some(layer) = reversed.pop() {
            self.queue.append(layer);
        }
        true
    }

    fn special_is_self_inverse(&self) -> bool {
        true
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn layers(&self) -> Vec<Layer> {
        self.queue.iter().copied().collect()
    }
}

// ============================================================================
// SEQUENCE: each layer type on/off, composed by index
// ============================================================================

/// Each layer type is either applied or not, and applied in `index` order.
///
/// - add: ensure the layer type is applied.
/// - erase: ensure the layer type is not applied.
/// - special: remove the layer with the median `name`; of two medians the
///   lexicographically smaller one goes.
///
/// The two lists always hold the same set of layers. Only `insert_entry` and
/// `remove_entry` touch them.
#[derive(Clone, Debug)]
pub struct SequenceLayerStore {
    by_index: SortedList<u8, Layer>,
    by_name: SortedList<&'static str, Layer>,
}

impl Default for SequenceLayerStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl SequenceLayerStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            by_index: SortedList::new(capacity),
            by_name: SortedList::new(capacity),
        }
    }

    pub fn contains(&self, layer: Layer) -> bool {
        self.by_index.contains_key(&layer.index())
    }

    /// Held layers in name order.
    pub fn layers_by_name(&self) -> Vec<Layer> {
        self.by_name.iter().map(|(_, layer)| *layer).collect()
    }

    /// The layer `special` would remove next.
    pub fn median_by_name(&self) -> Option<Layer> {
        let n = self.by_name.len();
        if n == 0 {
            return None;
        }
        if n % 2 == 1 {
            return self.by_name.get((n - 1) / 2).map(|(_, layer)| *layer);
        }
        let (lower_name, lower) = self.by_name.get(n / 2 - 1)?;
        let (upper_name, upper) = self.by_name.get(n / 2)?;
        if upper_name < lower_name {
            Some(*upper)
        } else {
            Some(*lower)
        }
    }

    fn insert_entry(&mut self, layer: Layer) -> bool {
        if self.by_index.is_full() || self.by_name.is_full() {
            return false;
        }
        self.by_index.add(layer.index(), layer) && self.by_name.add(layer.name(), layer)
    }

    fn remove_entry(&mut self, layer: Layer) -> bool {
        if self.by_index.remove_key(&layer.index()).is_none() {
            return false;
        }
        self.by_name.remove_key(&layer.name());
        true
    }
}

impl LayerStore for SequenceLayerStore {
    fn add(&mut self, layer: Layer) -> bool {
        if self.contains(layer) {
            return false;
        }
        self.insert_entry(layer)
    }

    fn erase(&mut self, layer: Layer) -> bool {
        self.remove_entry(layer)
    }

    fn get_color(&self, start: Color, timestamp: u64, x: usize, y: usize) -> Color {
        self.by_index
            .iter()
            .fold(start, |color, (_, layer)| layer.apply(color, timestamp, x, y))
    }

    fn special(&mut self) -> bool {
        match self.median_by_name() {
            Some(layer) => self.remove_entry(layer),
            None => false,
        }
    }

    fn special_is_self_inverse(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.by_index.len()
    }

    fn layers(&self) -> Vec<Layer> {
        self.by_index.iter().map(|(_, layer)| *layer).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const GREY: Color = Rgb([100, 100, 100]);

    #[test]
    fn set_add_same_layer_is_unchanged() {
        let mut store = SetLayerStore::new();
        assert!(store.add(Layer::Lighten));
        let before = store.get_color(GREY, 0, 0, 0);
        assert!(!store.add(Layer::Lighten));
        assert_eq!(store.get_color(GREY, 0, 0, 0), before);
        assert!(store.add(Layer::Black));
        assert_eq!(store.layers(), vec![Layer::Black]);
    }

    #[test]
    fn set_erase_ignores_argument() {
        let mut store = SetLayerStore::new();
        assert!(!store.erase(Layer::Black));
        store.add(Layer::Lighten);
        assert!(store.erase(Layer::Black));
        assert!(store.is_empty());
        assert_eq!(store.get_color(GREY, 0, 0, 0), GREY);
    }

    #[test]
    fn set_special_inverts_and_restores() {
        let mut store = SetLayerStore::new();
        store.special();
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([155, 155, 155]));
        store.add(Layer::Lighten);
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([115, 115, 115]));
        store.special();
        assert!(!store.is_inverted());
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([140, 140, 140]));
        assert_eq!(store.layers(), vec![Layer::Lighten]);
    }

    #[test]
    fn additive_folds_in_insertion_order() {
        let mut store = AdditiveLayerStore::default();
        assert_eq!(store.get_color(GREY, 0, 0, 0), GREY);
        store.add(Layer::Black);
        store.add(Layer::Lighten);
        store.add(Layer::Lighten);
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([80, 80, 80]));
        // Oldest (black) goes first.
        assert!(store.erase(Layer::Invert));
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([180, 180, 180]));
    }

    #[test]
    fn additive_special_reverses() {
        let mut store = AdditiveLayerStore::default();
        store.add(Layer::Lighten);
        store.add(Layer::Black);
        store.add(Layer::Invert);
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([255, 255, 255]));
        assert!(store.special());
        assert_eq!(store.layers(), vec![Layer::Invert, Layer::Black, Layer::Lighten]);
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([40, 40, 40]));
        store.special();
        assert_eq!(store.layers(), vec![Layer::Lighten, Layer::Black, Layer::Invert]);
    }

    #[test]
    fn additive_special_on_tiny_store_is_noop() {
        let mut store = AdditiveLayerStore::default();
        assert!(!store.special());
        store.add(Layer::Red);
        assert!(!store.special());
        assert_eq!(store.layers(), vec![Layer::Red]);
    }

    #[test]
    fn additive_refuses_when_full() {
        let mut store = AdditiveLayerStore::new(3);
        assert!(store.add(Layer::Red));
        assert!(store.add(Layer::Green));
        assert!(store.add(Layer::Blue));
        assert!(!store.add(Layer::Black));
        assert_eq!(store.layers(), vec![Layer::Red, Layer::Green, Layer::Blue]);
        assert_eq!(store.get_color(Rgb([0, 0, 0]), 0, 0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn sequence_composes_by_index() {
        let mut store = SequenceLayerStore::default();
        store.add(Layer::Lighten);
        store.add(Layer::Black);
        // black (1) before lighten (2)
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([40, 40, 40]));
        assert!(!store.add(Layer::Black));
        assert!(store.erase(Layer::Lighten));
        assert!(!store.erase(Layer::Lighten));
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn sequence_special_removes_median_name() {
        let mut store = SequenceLayerStore::default();
        for layer in [Layer::Invert, Layer::Lighten, Layer::Rainbow, Layer::Black] {
            store.add(layer);
        }
        // rainbow, black, lighten, invert
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([215, 215, 215]));

        // black, invert, lighten, rainbow → invert
        assert!(store.special());
        assert!(!store.contains(Layer::Invert));
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([40, 40, 40]));

        // black, lighten, rainbow → lighten
        assert!(store.special());
        assert_eq!(store.layers(), vec![Layer::Rainbow, Layer::Black]);

        // black, rainbow → black
        assert!(store.special());
        assert_eq!(store.layers(), vec![Layer::Rainbow]);
        assert_eq!(store.get_color(GREY, 0, 0, 0), Rgb([177, 50, 50]));

        assert!(store.special());
        assert!(store.is_empty());
        assert!(!store.special());
    }

    #[test]
    fn sequence_lists_stay_in_lock_step() {
        let mut store = SequenceLayerStore::default();
        for layer in Layer::all() {
            store.add(*layer);
        }
        store.erase(Layer::Green);
        store.special();
        let mut by_index = store.layers();
        let mut by_name = store.layers_by_name();
        by_index.sort_by_key(|l| l.index());
        by_name.sort_by_key(|l| l.index());
        assert_eq!(by_index, by_name);
        assert_eq!(store.len(), Layer::all().len() - 2);
    }

    #[test]
    fn sequence_refuses_when_full() {
        let mut store = SequenceLayerStore::new(2);
        assert!(store.add(Layer::Darken));
        assert!(store.add(Layer::Red));
        assert!(!store.add(Layer::Blue));
        assert_eq!(store.layers(), vec![Layer::Red, Layer::Darken]);
        assert_eq!(store.layers_by_name(), vec![Layer::Darken, Layer::Red]);
    }
}
