//! Property-based invariant tests for layer stores, bounded collections and
//! session replay.
//!
//! Verifies:
//! 1. Additive: colour is the fold of held layers, oldest first
//! 2. Additive: special reverses the order, twice restores it
//! 3. Sequence: layers are unique and composed in index order
//! 4. Sequence: N specials empty an N-layer store, the next one reports false
//! 5. Bounded stack/queue: never exceed capacity, refusals leave contents intact
//! 6. Session: replaying the recorded log reproduces the live grid

use gridpaint::collections::{BoundedQueue, BoundedStack};
use gridpaint::{
    AdditiveLayerStore, Color, DrawStyle, GridConfig, HistoryConfig, Layer, LayerStore,
    SequenceLayerStore, Session, WHITE,
};
use image::Rgb;
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_layer() -> impl Strategy<Value = Layer> {
    proptest::sample::select(Layer::all().to_vec())
}

fn arb_color() -> impl Strategy<Value = Color> {
    any::<[u8; 3]>().prop_map(Rgb)
}

fn arb_style() -> impl Strategy<Value = DrawStyle> {
    prop_oneof![
        Just(DrawStyle::Set),
        Just(DrawStyle::Additive),
        Just(DrawStyle::Sequence),
    ]
}

#[derive(Clone, Debug)]
enum Op {
    Paint(Layer, usize, usize),
    Special,
    Undo,
    Redo,
    BrushUp,
    BrushDown,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (arb_layer(), 0usize..6, 0usize..6).prop_map(|(l, x, y)| Op::Paint(l, x, y)),
        2 => Just(Op::Special),
        2 => Just(Op::Undo),
        1 => Just(Op::Redo),
        1 => Just(Op::BrushUp),
        1 => Just(Op::BrushDown),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Additive fold order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn additive_color_is_ordered_fold(
        layers in prop::collection::vec(arb_layer(), 0..12),
        start in arb_color(),
        t in 0u64..50,
    ) {
        let mut store = AdditiveLayerStore::new(64);
        for layer in &layers {
            prop_assert!(store.add(*layer));
        }
        let expected = layers.iter().fold(start, |c, l| l.apply(c, t, 2, 3));
        prop_assert_eq!(store.get_color(start, t, 2, 3), expected);
        prop_assert_eq!(store.layers(), layers);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Additive special reverses
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn additive_special_reverses(layers in prop::collection::vec(arb_layer(), 0..12)) {
        let mut store = AdditiveLayerStore::new(64);
        for layer in &layers {
            store.add(*layer);
        }
        let changed = store.special();
        prop_assert_eq!(changed, layers.len() >= 2);
        let mut reversed = layers.clone();
        reversed.reverse();
        prop_assert_eq!(store.layers(), reversed);
        store.special();
        prop_assert_eq!(store.layers(), layers);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Sequence index order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sequence_composes_in_index_order(
        layers in prop::collection::vec(arb_layer(), 0..20),
        start in arb_color(),
    ) {
        let mut store = SequenceLayerStore::new(64);
        for layer in &layers {
            store.add(*layer);
        }
        let mut expected: Vec<Layer> = layers.clone();
        expected.sort_by_key(|l| l.index());
        expected.dedup();
        prop_assert_eq!(store.layers(), expected.clone());
        let color = expected.iter().fold(start, |c, l| l.apply(c, 4, 1, 1));
        prop_assert_eq!(store.get_color(start, 4, 1, 1), color);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Sequence specials terminate
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sequence_specials_drain_store(layers in prop::collection::vec(arb_layer(), 0..20)) {
        let mut store = SequenceLayerStore::new(64);
        for layer in &layers {
            store.add(*layer);
        }
        let n = store.len();
        for remaining in (0..n).rev() {
            let median = store.median_by_name();
            prop_assert!(store.special());
            prop_assert_eq!(store.len(), remaining);
            if let Some(gone) = median {
                prop_assert!(!store.contains(gone));
            }
        }
        prop_assert!(!store.special());
        prop_assert!(store.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Bounded collections respect capacity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bounded_stack_refuses_past_capacity(cap in 0usize..8, items in prop::collection::vec(any::<u8>(), 0..16)) {
        let mut stack = BoundedStack::new(cap);
        for (i, item) in items.iter().enumerate() {
            prop_assert_eq!(stack.push(*item), i < cap);
            prop_assert!(stack.len() <= cap);
        }
        let kept: Vec<u8> = stack.iter().copied().collect();
        prop_assert_eq!(kept.as_slice(), &items[..items.len().min(cap)]);
    }
}

proptest! {
    #[test]
    fn bounded_queue_is_fifo_under_wraparound(
        cap in 1usize..6,
        ops in prop::collection::vec(prop::option::of(any::<u8>()), 0..40),
    ) {
        let mut queue = BoundedQueue::new(cap);
        let mut model: std::collections::VecDeque<u8> = std::collections::VecDeque::new();
        for op in ops {
            match op {
                Some(item) => {
                    let accepted = queue.append(item);
                    prop_assert_eq!(accepted, model.len() < cap);
                    if accepted {
                        model.push_back(item);
                    }
                }
                None => prop_assert_eq!(queue.serve(), model.pop_front()),
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.iter().copied().eq(model.iter().copied()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Replay reproduces the live session
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_matches_live_grid(style in arb_style(), ops in prop::collection::vec(arb_op(), 0..30)) {
        let mut live = Session::new(GridConfig::new(style, 6, 6), HistoryConfig::default());
        for op in ops {
            match op {
                Op::Paint(layer, x, y) => {
                    live.paint(layer, x, y);
                }
                Op::Special => live.special(),
                Op::Undo => {
                    live.undo();
                }
                Op::Redo => {
                    live.redo();
                }
                Op::BrushUp => live.increase_brush_size(),
                Op::BrushDown => live.decrease_brush_size(),
            }
        }
        let expected = live.grid().render(WHITE, 9);

        let mut target = live.fresh_grid();
        live.start_replay();
        while !live.replay_next(&mut target) {}
        prop_assert_eq!(target.render(WHITE, 9), expected);
    }
}
