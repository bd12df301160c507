#[derive(Clone)]
pub(crate) struct RunTime {
    start: std::time::Instant,
    end: std::time::Instant,
}

impl RunTime {
    pub(crate) fn since_start(start: std::time::Instant) -> Self {
        Self {
            start,
            end: std::time::Instant::now(),
        }
    }
}

impl serde::Serialize for RunTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let duration = self.end - self.start;
        serializer.serialize_str(&format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis()))
    }
}

#[derive(serde::Serialize, Clone)]
pub(crate) struct RunTimes {
    pub(crate) load_run_time: RunTime,
    pub(crate) execute_run_time: RunTime,
    pub(crate) commit_run_time: RunTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_run_time_serialization() -> anyhow::Result<()> {
        let start = Instant::now();
        let run_time = RunTime {
            start,
            end: start + Duration::from_millis(2_045),
        };

        assert_eq!(serde_json::to_string(&run_time)?, r#""2.045s""#);

        Ok(())
    }
}
