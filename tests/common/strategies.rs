use proptest::prelude::*;

/// One operation against an LRU cache; keys come from a small space so
/// operations collide often
#[derive(Debug, Clone)]
pub enum LruOp {
    Get(u8),
    Set(u8, u32),
    Delete(u8),
}

impl LruOp {
    pub fn key(id: u8) -> String {
        format!("market:quote:SYM{id}")
    }
}

/// Strategy for generating LRU operations over `key_space` distinct keys
pub fn lru_op_strategy(key_space: u8) -> impl Strategy<Value = LruOp> {
    prop_oneof![
        4 => (0..key_space).prop_map(LruOp::Get),
        4 => (0..key_space, any::<u32>()).prop_map(|(k, v)| LruOp::Set(k, v)),
        1 => (0..key_space).prop_map(LruOp::Delete),
    ]
}

/// Strategy for generating operation sequences
pub fn lru_ops_strategy(key_space: u8) -> impl Strategy<Value = Vec<LruOp>> {
    prop::collection::vec(lru_op_strategy(key_space), 1..200)
}

/// Strategy for generating LRU capacities
pub fn capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..12
}
