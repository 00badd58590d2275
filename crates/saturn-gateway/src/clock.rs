use saturn_connect_core::{ClockPort, PortError};

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("time error: {e}")))?;
        Ok(now.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_wall_clock_millis() {
        let now = SystemClock.now_ms().expect("clock");
        // 2020-09-13
        assert!(now > 1_600_000_000_000);
    }
}
