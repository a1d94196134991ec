//! CONTEXT: Property tests comparing queue behaviour against a reference model
//! OWNERS: @runtime
//! STATUS: Functional
//!
//! TEST_SCOPE:
//!   - Byte and message counters match the queued messages
//!   - Segment and header pools account for every queued message
//!   - Selector semantics and truncation match a VecDeque model
//!
//! TEST_SCENARIOS:
//!   - random non-blocking send/receive sequences over two queues

use std::collections::VecDeque;

use nexus_msgq::{Caller, Error, GetFlags, Key, Limits, MsgSystem, MsqId, RecvFlags, SendFlags};
use proptest::prelude::*;

const LIMITS: Limits = Limits {
    max_queues: 2,
    max_queue_bytes: 96,
    max_headers: 6,
    segment_size: 8,
    segment_count: 20,
};

#[derive(Debug, Clone)]
enum Op {
    Send { queue: usize, mtype: i64, len: usize },
    Recv { queue: usize, selector: i64, max: usize, truncate: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2, 1i64..5, 0usize..40).prop_map(|(queue, mtype, len)| Op::Send { queue, mtype, len }),
        (0usize..2, -5i64..5, 0usize..40, any::<bool>())
            .prop_map(|(queue, selector, max, truncate)| Op::Recv { queue, selector, max, truncate }),
    ]
}

#[derive(Default)]
struct Model {
    queues: [VecDeque<(i64, Vec<u8>)>; 2],
}

impl Model {
    fn bytes(&self, q: usize) -> usize {
        self.queues[q].iter().map(|(_, d)| d.len()).sum()
    }

    fn headers_used(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    fn segments_used(&self) -> usize {
        self.queues.iter().flatten().map(|(_, d)| LIMITS.segments_for(d.len())).sum()
    }

    fn admits(&self, q: usize, len: usize) -> bool {
        self.bytes(q) + len <= LIMITS.max_queue_bytes
            && self.headers_used() < LIMITS.max_headers
            && self.segments_used() + LIMITS.segments_for(len) <= LIMITS.segment_count
    }

    fn find(&self, q: usize, selector: i64) -> Option<usize> {
        self.queues[q].iter().position(|(mtype, _)| match selector {
            0 => true,
            s if s > 0 => *mtype == s,
            s => *mtype <= -s,
        })
    }
}

fn payload(counter: &mut u8, len: usize) -> Vec<u8> {
    *counter = counter.wrapping_add(1);
    (0..len).map(|i| counter.wrapping_add(i as u8)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_reference_model(ops in proptest::collection::vec(op(), 1..80)) {
        let sys = MsgSystem::start(LIMITS).unwrap();
        let caller = Caller::root(1);
        let ids: Vec<MsqId> = (0..2)
            .map(|_| sys.create_or_lookup(&caller, Key::Private, GetFlags::empty(), 0o600).unwrap())
            .collect();
        let mut model = Model::default();
        let mut counter = 0u8;

        for op in ops {
            match op {
                Op::Send { queue, mtype, len } => {
                    let data = payload(&mut counter, len);
                    let got = sys.send(&caller, ids[queue], mtype, &data, SendFlags::NOWAIT);
                    if model.admits(queue, len) {
                        prop_assert_eq!(got, Ok(()));
                        model.queues[queue].push_back((mtype, data));
                    } else {
                        prop_assert_eq!(got, Err(Error::WouldBlock));
                    }
                }
                Op::Recv { queue, selector, max, truncate } => {
                    let flags = if truncate {
                        RecvFlags::NOWAIT | RecvFlags::NOERROR
                    } else {
                        RecvFlags::NOWAIT
                    };
                    let got = sys.receive_message(&caller, ids[queue], max, selector, flags);
                    match model.find(queue, selector) {
                        None => prop_assert_eq!(got, Err(Error::NoMessage)),
                        Some(pos) if model.queues[queue][pos].1.len() > max && !truncate => {
                            prop_assert_eq!(got, Err(Error::MessageTooLarge));
                        }
                        Some(pos) => {
                            let (mtype, data) = model.queues[queue].remove(pos).unwrap();
                            let msg = got.unwrap();
                            prop_assert_eq!(msg.mtype, mtype);
                            prop_assert_eq!(msg.data.as_slice(), &data[..data.len().min(max)]);
                        }
                    }
                }
            }

            for (q, id) in ids.iter().enumerate() {
                let stat = sys.stat(&caller, *id).unwrap();
                prop_assert_eq!(stat.cbytes, model.bytes(q));
                prop_assert_eq!(stat.qnum, model.queues[q].len());
                prop_assert!(stat.cbytes <= stat.qbytes);
                prop_assert!(!stat.mutation.is_locked());
            }
            let usage = sys.pool_usage();
            prop_assert_eq!(usage.total_headers - usage.free_headers, model.headers_used());
            prop_assert_eq!(usage.total_segments - usage.free_segments, model.segments_used());
        }

        for id in ids {
            sys.remove(&caller, id).unwrap();
        }
        let usage = sys.pool_usage();
        prop_assert_eq!(usage.free_headers, usage.total_headers);
        prop_assert_eq!(usage.free_segments, usage.total_segments);
        prop_assert_eq!(sys.shutdown(), Ok(()));
    }
}
