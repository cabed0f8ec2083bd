use std::result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hydractor::SystemBuilder;
use slog::{o, Drain, Fuse, Key, Logger, OwnedKVList, Record, Serializer};

mod common {
    use super::*;

    pub struct CountingSerializer;

    impl Serializer for CountingSerializer {
        fn emit_arguments(&mut self, _key: Key, _val: &std::fmt::Arguments) -> slog::Result {
            Ok(())
        }
    }

    #[derive(Clone)]
    pub struct CountingDrain {
        pub count: Arc<AtomicUsize>,
    }

    impl Drain for CountingDrain {
        type Ok = ();
        type Err = ();

        fn log(&self, record: &Record, values: &OwnedKVList) -> result::Result<Self::Ok, Self::Err> {
            self.count.fetch_add(1, Ordering::SeqCst);
            let _ = record.kv().serialize(record, &mut CountingSerializer);
            let _ = values.serialize(record, &mut CountingSerializer);
            Ok(())
        }
    }
}

#[tokio::test]
async fn actor_system_bootstrap_logs_through_a_caller_supplied_drain() {
    let count = Arc::new(AtomicUsize::new(0));
    let drain = common::CountingDrain { count: count.clone() };
    let log = Logger::root(Fuse(drain), o!("component" => "test"));

    let system = SystemBuilder::new().log(log).create().await.unwrap();
    assert!(count.load(Ordering::SeqCst) > 0);

    system.destroy().await.unwrap();
}
