use ::use_cases::gateways::Clock;

/// Calendar days as seen by the device, in its local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> ::chrono::NaiveDate {
        ::chrono::Local::now().date_naive()
    }
}
