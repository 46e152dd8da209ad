use crate::json::{MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::Message;

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// `google.protobuf.Duration`: a signed span of time. JSON form `"1.5s"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Message)]
#[protolite(name = "google.protobuf.Duration")]
pub struct Duration {
    /// Whole seconds.
    #[protolite(tag = 1, int64)]
    pub seconds: i64,
    /// Nanoseconds, with the sign of `seconds`.
    #[protolite(tag = 2, int32)]
    pub nanos: i32,
}

impl Duration {
    /// Carry whole seconds out of `nanos` and give both fields the same sign.
    pub fn normalize(&mut self) {
        self.seconds = self.seconds.saturating_add(i64::from(self.nanos / NANOS_PER_SECOND));
        self.nanos %= NANOS_PER_SECOND;
        if self.seconds > 0 && self.nanos < 0 {
            self.seconds -= 1;
            self.nanos += NANOS_PER_SECOND;
        } else if self.seconds < 0 && self.nanos > 0 {
            self.seconds += 1;
            self.nanos -= NANOS_PER_SECOND;
        }
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self {
            seconds: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            nanos: d.subsec_nanos() as i32,
        }
    }
}

impl TryFrom<Duration> for std::time::Duration {
    type Error = Duration;

    /// Fails for negative durations.
    fn try_from(d: Duration) -> Result<Self, Duration> {
        let mut n = d;
        n.normalize();
        match (u64::try_from(n.seconds), u32::try_from(n.nanos)) {
            (Ok(seconds), Ok(nanos)) => Ok(std::time::Duration::new(seconds, nanos)),
            _ => Err(d),
        }
    }
}

impl MarshalProtoJson for Duration {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        s.write_duration(self.seconds, self.nanos)
    }
}

impl UnmarshalProtoJson for Duration {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        (self.seconds, self.nanos) = s.read_duration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        let mut d = Duration { seconds: 1, nanos: -1 };
        d.normalize();
        assert_eq!(d, Duration { seconds: 0, nanos: 999_999_999 });

        let mut d = Duration { seconds: -1, nanos: 2_000_000_001 };
        d.normalize();
        assert_eq!(d, Duration { seconds: 1, nanos: 1 });

        let mut d = Duration { seconds: -2, nanos: 1 };
        d.normalize();
        assert_eq!(d, Duration { seconds: -1, nanos: -999_999_999 });
    }

    #[test]
    fn std_conversion() {
        let d = Duration::from(std::time::Duration::from_millis(1500));
        assert_eq!(d, Duration { seconds: 1, nanos: 500_000_000 });
        assert_eq!(std::time::Duration::try_from(d), Ok(std::time::Duration::from_millis(1500)));
        assert!(std::time::Duration::try_from(Duration { seconds: -1, nanos: 0 }).is_err());
    }

    #[test]
    fn binary() {
        let d = Duration { seconds: 3723, nanos: 123_456_789 };
        let buf = crate::to_vec(&d).unwrap();
        assert_eq!(buf[..3], [0x08, 0x8b, 0x1d]);
        assert_eq!(crate::read::<Duration>(&buf).unwrap(), d);
        assert!(crate::to_vec(&Duration::default()).unwrap().is_empty());
    }

    #[test]
    fn json() {
        let d = Duration { seconds: -3, nanos: -100_000_000 };
        assert_eq!(crate::json::marshal(&d).unwrap(), br#""-3.100s""#);
        let mut back = Duration::default();
        crate::json::unmarshal(br#""-3.1s""#, &mut back).unwrap();
        assert_eq!(back, d);
    }
}
