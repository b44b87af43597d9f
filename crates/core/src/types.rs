/// Monotonic simulation tick, starting at 1 for the first stepped frame.
pub type Tick = u64;

/// Identifies whoever submits operator actions (a player, a script, an agent).
pub type PlayerId = u8;

/// Per-submitter action sequence number, used to order same-tick actions.
pub type ActionId = u64;
