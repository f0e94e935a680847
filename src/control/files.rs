//! Control file names of the cgroup v1 memory controller.

/// Set to `1` so charges follow a task that moves into the group.
pub const MOVE_CHARGE_AT_IMMIGRATE: &str = "memory.move_charge_at_immigrate";
pub const LIMIT_IN_BYTES: &str = "memory.limit_in_bytes";
pub const CGROUP_PROCS: &str = "cgroup.procs";
/// Writing to it reclaims as much of the group's memory as possible.
pub const FORCE_EMPTY: &str = "memory.force_empty";
/// Readable only while kernel memory accounting is active for the group.
pub const KMEM_SLABINFO: &str = "memory.kmem.slabinfo";

/// Files whose lines are replayed into the mirror group, in this order.
pub const REPLAYED: [&str; 2] = [LIMIT_IN_BYTES, CGROUP_PROCS];

pub const MIGRATION_ENABLED: &str = "1";
pub const DRAIN: &str = "0";

/// Whether `name` is one of the [`REPLAYED`] control files.
pub fn is_replayed(name: &str) -> bool {
    REPLAYED.contains(&name)
}
