/*
 * Test utilities and fake capabilities for Thermowire
 *
 * This module provides the scripted bus, the manually advanced clock,
 * and the recording observer shared by the unit tests.
 */

#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::bus::{DeviceAddress, Resolution, TemperatureBus, DISCONNECTED_C, DISCONNECTED_F};
    use crate::clock::Clock;
    use crate::poller::{BusPoller, PollObserver, SensorEvent};

    pub fn test_address(serial: u8) -> DeviceAddress {
        DeviceAddress::new([40, 0, 0, 0, 0, 0, serial, 100])
    }

    #[derive(Debug, Default)]
    pub struct FakeBusState {
        pub devices: Vec<DeviceAddress>,
        pub temps_c: HashMap<DeviceAddress, f32>,
        pub conversion_complete: bool,
        pub conversion_requests: usize,
        pub init_calls: usize,
        pub wait_flag: Option<bool>,
        pub resolution: Option<Resolution>,
    }

    /// Shared handle to a scripted bus. The handle stays with the test
    /// while `bus()` hands an owning view to the poller.
    #[derive(Clone, Default)]
    pub struct FakeBusHandle(Arc<Mutex<FakeBusState>>);

    impl FakeBusHandle {
        pub fn new(devices: Vec<DeviceAddress>) -> Self {
            let handle = FakeBusHandle::default();
            handle.0.lock().unwrap().devices = devices;
            handle
        }

        pub fn bus(&self) -> FakeBus {
            FakeBus(self.0.clone())
        }

        pub fn add_device(&self, address: DeviceAddress) {
            self.0.lock().unwrap().devices.push(address);
        }

        pub fn set_temp_c(&self, address: DeviceAddress, celsius: f32) {
            self.0.lock().unwrap().temps_c.insert(address, celsius);
        }

        /// Make reads of this device fail with the sentinel.
        pub fn disconnect(&self, address: DeviceAddress) {
            self.0.lock().unwrap().temps_c.remove(&address);
        }

        pub fn set_conversion_complete(&self, complete: bool) {
            self.0.lock().unwrap().conversion_complete = complete;
        }

        pub fn conversion_requests(&self) -> usize {
            self.0.lock().unwrap().conversion_requests
        }

        pub fn init_calls(&self) -> usize {
            self.0.lock().unwrap().init_calls
        }

        pub fn wait_flag(&self) -> Option<bool> {
            self.0.lock().unwrap().wait_flag
        }

        pub fn resolution(&self) -> Option<Resolution> {
            self.0.lock().unwrap().resolution
        }
    }

    pub struct FakeBus(Arc<Mutex<FakeBusState>>);

    impl TemperatureBus for FakeBus {
        fn init(&mut self) {
            self.0.lock().unwrap().init_calls += 1;
        }

        fn set_wait_for_conversion(&mut self, wait: bool) {
            self.0.lock().unwrap().wait_flag = Some(wait);
        }

        fn set_resolution(&mut self, resolution: Resolution) {
            self.0.lock().unwrap().resolution = Some(resolution);
        }

        fn device_count(&self) -> usize {
            self.0.lock().unwrap().devices.len()
        }

        fn device_address(&self, index: usize) -> Option<DeviceAddress> {
            self.0.lock().unwrap().devices.get(index).copied()
        }

        fn start_conversion_for_all(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.conversion_requests += 1;
            state.conversion_complete = false;
        }

        fn is_conversion_complete(&self) -> bool {
            self.0.lock().unwrap().conversion_complete
        }

        fn read_celsius(&mut self, address: &DeviceAddress) -> f32 {
            self.0
                .lock()
                .unwrap()
                .temps_c
                .get(address)
                .copied()
                .unwrap_or(DISCONNECTED_C)
        }

        fn read_fahrenheit(&mut self, address: &DeviceAddress) -> f32 {
            self.0
                .lock()
                .unwrap()
                .temps_c
                .get(address)
                .map(|c| c * 9.0 / 5.0 + 32.0)
                .unwrap_or(DISCONNECTED_F)
        }
    }

    /// Clock the tests move by hand.
    #[derive(Default)]
    pub struct ManualClock {
        millis: AtomicU64,
    }

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(ManualClock::default())
        }

        pub fn set(&self, millis: u64) {
            self.millis.store(millis, Ordering::SeqCst);
        }

        pub fn advance(&self, millis: u64) {
            self.millis.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EventKind {
        Change,
        Interval,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedEvent {
        pub kind: EventKind,
        pub temperature: f32,
        pub valid: bool,
        pub wire_name: String,
        pub pin: u8,
        pub sensor_index: usize,
    }

    impl RecordedEvent {
        fn from(kind: EventKind, event: &SensorEvent<'_>) -> Self {
            RecordedEvent {
                kind,
                temperature: event.temperature,
                valid: event.valid,
                wire_name: event.wire_name.to_string(),
                pin: event.pin,
                sensor_index: event.sensor_index,
            }
        }
    }

    /// Shared journal of observer callbacks, in firing order.
    #[derive(Clone, Default)]
    pub struct EventLog(Arc<Mutex<Vec<RecordedEvent>>>);

    impl EventLog {
        pub fn observer(&self) -> Box<dyn PollObserver> {
            Box::new(RecordingObserver(self.0.clone()))
        }

        pub fn events(&self) -> Vec<RecordedEvent> {
            self.0.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    struct RecordingObserver(Arc<Mutex<Vec<RecordedEvent>>>);

    impl PollObserver for RecordingObserver {
        fn on_temperature_change(&mut self, event: &SensorEvent<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(RecordedEvent::from(EventKind::Change, event));
        }

        fn on_interval_elapsed(&mut self, event: &SensorEvent<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(RecordedEvent::from(EventKind::Interval, event));
        }
    }

    /// Poller on pin 4 wired to a scripted bus, a manual clock at t=0,
    /// and a recording observer.
    pub fn poller_fixture(
        devices: Vec<DeviceAddress>,
    ) -> (BusPoller, FakeBusHandle, Arc<ManualClock>, EventLog) {
        let handle = FakeBusHandle::new(devices);
        let clock = ManualClock::new();
        let log = EventLog::default();
        let mut poller = BusPoller::new(Box::new(handle.bus()), 4);
        poller.set_clock(clock.clone());
        poller.add_observer(log.observer());
        (poller, handle, clock, log)
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::bus::{TemperatureBus, DISCONNECTED_C};

    #[test]
    fn test_fake_bus_scripting() {
        let handle = FakeBusHandle::new(vec![test_address(0)]);
        let mut bus = handle.bus();

        assert_eq!(bus.device_count(), 1);
        assert_eq!(bus.device_address(0), Some(test_address(0)));
        assert_eq!(bus.device_address(1), None);

        assert_eq!(bus.read_celsius(&test_address(0)), DISCONNECTED_C);
        handle.set_temp_c(test_address(0), 25.0);
        assert_eq!(bus.read_celsius(&test_address(0)), 25.0);
        assert_eq!(bus.read_fahrenheit(&test_address(0)), 77.0);

        bus.start_conversion_for_all();
        assert_eq!(handle.conversion_requests(), 1);
        assert!(!bus.is_conversion_complete());
        handle.set_conversion_complete(true);
        assert!(bus.is_conversion_complete());
    }

    #[test]
    fn test_manual_clock() {
        use crate::clock::Clock;
        let clock = ManualClock::new();
        assert_eq!(clock.now_millis(), 0);
        clock.set(500);
        assert_eq!(clock.now_millis(), 500);
        clock.advance(300);
        assert_eq!(clock.now_millis(), 800);
    }
}
