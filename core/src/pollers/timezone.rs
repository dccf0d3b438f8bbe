use std::io;
use std::path::Path;
use std::time::Duration;

use crate::pollers::run_periodic;
use crate::state::ChatState;
use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::work_queue::Mutation;
use crate::work_queue::WorkSender;
use crate::work_queue::mutation;

const LOCALTIME_LINK: &str = "/etc/localtime";

/// Where the local timezone name comes from.
pub trait TimeZoneSource: Send {
    /// `None` when the zone cannot be determined right now.
    fn current(&self) -> Option<String>;
}

/// Reads `$TZ`, then the `/etc/localtime` symlink, then falls back to the
/// current UTC offset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeZone;

impl TimeZoneSource for SystemTimeZone {
    fn current(&self) -> Option<String> {
        if let Ok(tz) = std::env::var("TZ")
            && !tz.is_empty()
        {
            return Some(tz);
        }
        if let Some(zone) = zone_from_link(Path::new(LOCALTIME_LINK)) {
            return Some(zone);
        }
        Some(chrono::Local::now().offset().to_string())
    }
}

fn zone_from_link(link: &Path) -> Option<String> {
    let target = std::fs::read_link(link).ok()?;
    let target = target.to_string_lossy();
    let (_, zone) = target.split_once("zoneinfo/")?;
    Some(zone.to_string())
}

/// Remembers the last zone seen and produces a mutation only on change.
#[derive(Debug)]
pub struct TimezoneMonitor<Z> {
    source: Z,
    last_seen: Option<String>,
}

impl<Z: TimeZoneSource> TimezoneMonitor<Z> {
    pub fn new(source: Z) -> Self {
        Self {
            source,
            last_seen: None,
        }
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    pub fn check(&mut self) -> Option<Mutation<ChatState>> {
        let zone = self.source.current()?;
        if self.last_seen.as_deref() == Some(zone.as_str()) {
            return None;
        }
        tracing::info!("local timezone is now {zone}");
        self.last_seen = Some(zone.clone());
        Some(mutation(move |state: &mut ChatState| {
            state.set_time_zone(zone);
            Ok(())
        }))
    }
}

pub fn spawn_timezone_monitor<Z>(
    source: Z,
    interval: Duration,
    work: WorkSender<ChatState>,
) -> io::Result<TaskHandle>
where
    Z: TimeZoneSource + 'static,
{
    let mut monitor = TimezoneMonitor::new(source);
    spawn_task("timezone-monitor", move || {
        run_periodic(interval, || match monitor.check() {
            Some(mutation) => work.try_submit(mutation),
            None => true,
        });
        tracing::debug!("work queue closed; timezone monitor exiting");
    })
}
