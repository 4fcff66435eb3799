//! Device kind distinguishing which unsynchronized queue a ready task
//! lands in (spec §4.2: "one unsync scheduler per device kind (host,
//! cluster, others)"). This workspace only ever executes on the host, but
//! the cluster offload path needs its own queue of tasks awaiting a
//! remote slot, kept separate so host dispatch never scans past them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Host,
    Cluster,
}
