pub trait Probe {
    type Msg: Send;
    type Pay: Clone + Send;

    fn event(&self, evt: Self::Msg);
    fn payload(&self) -> &Self::Pay;
}

#[async_trait::async_trait]
pub trait ProbeReceive {
    type Msg: Send;

    async fn recv(&mut self) -> Self::Msg;
    fn reset_timer(&mut self);
    fn last_event_milliseconds(&self) -> u64;
    fn last_event_seconds(&self) -> u64;
}

/// The channel module provides a `tokio::sync::mpsc`-based Probe
/// suitable for asserting on events emitted from async actor handlers.
pub mod channel {
    use super::{Probe, ProbeReceive};

    use chrono::prelude::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    pub fn probe<T: Send>() -> (ChannelProbe<(), T>, ChannelProbeReceive<T>) {
        probe_with_payload(())
    }

    pub fn probe_with_payload<P: Clone + Send, T: Send>(
        payload: P,
    ) -> (ChannelProbe<P, T>, ChannelProbeReceive<T>) {
        let (tx, rx) = unbounded_channel::<T>();

        let probe = ChannelProbe {
            payload: Some(payload),
            tx: tx.clone(),
        };

        let receiver = ChannelProbeReceive {
            rx,
            tx,
            timer_start: Utc::now(),
        };

        (probe, receiver)
    }

    #[derive(Clone)]
    pub struct ChannelProbe<P, T> {
        payload: Option<P>,
        tx: UnboundedSender<T>,
    }

    impl<P, T> Probe for ChannelProbe<P, T>
    where
        P: Clone + Send,
        T: Send,
    {
        type Msg = T;
        type Pay = P;

        fn event(&self, evt: T) {
            drop(self.tx.send(evt));
        }

        fn payload(&self) -> &P {
            self.payload.as_ref().unwrap()
        }
    }

    impl<P, T> Probe for Option<ChannelProbe<P, T>>
    where
        P: Clone + Send,
        T: Send,
    {
        type Msg = T;
        type Pay = P;

        fn event(&self, evt: T) {
            drop(self.as_ref().unwrap().tx.send(evt));
        }

        fn payload(&self) -> &P {
            self.as_ref().unwrap().payload.as_ref().unwrap()
        }
    }

    #[allow(dead_code)]
    pub struct ChannelProbeReceive<T> {
        rx: UnboundedReceiver<T>,
        tx: UnboundedSender<T>,
        timer_start: DateTime<Utc>,
    }

    #[async_trait::async_trait]
    impl<T: Send> ProbeReceive for ChannelProbeReceive<T> {
        type Msg = T;

        async fn recv(&mut self) -> T {
            self.rx.recv().await.unwrap()
        }

        fn reset_timer(&mut self) {
            self.timer_start = Utc::now();
        }

        fn last_event_milliseconds(&self) -> u64 {
            let now = Utc::now();
            now.time()
                .signed_duration_since(self.timer_start.time())
                .num_milliseconds() as u64
        }

        fn last_event_seconds(&self) -> u64 {
            let now = Utc::now();
            now.time()
                .signed_duration_since(self.timer_start.time())
                .num_seconds() as u64
        }
    }
}


/// Macros that provide easy use of Probes against async `recv().await` probes.
pub mod macros {
    /// Mimics `assert_eq!` against the next event received by the probe.
    #[macro_export]
    macro_rules! p_assert_eq {
        ($listen:expr, $expected:expr) => {
            assert_eq!($listen.recv().await, $expected);
        };
    }

    /// Asserts that the set of events received (in any order) matches
    /// `$expected`, consuming each expectation as it arrives.
    #[macro_export]
    macro_rules! p_assert_events {
        ($listen:expr, $expected:expr) => {
            let mut expected = $expected.clone();

            loop {
                let got = $listen.recv().await;
                match expected.iter().position(|x| x == &got) {
                    Some(pos) => {
                        expected.remove(pos);
                        if expected.is_empty() {
                            break;
                        }
                    }
                    _ => {
                        assert!(false, "unexpected probe event");
                    }
                }
            }
        };
    }

    #[macro_export]
    macro_rules! p_timer {
        ($listen:expr) => {
            $listen.last_event_milliseconds()
        };
    }
}
