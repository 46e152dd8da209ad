use std::time::{SystemTime, UNIX_EPOCH};

use time::OffsetDateTime;

use crate::json::{MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::Message;

/// `google.protobuf.Timestamp`: a point in time, as seconds and nanoseconds
/// since the Unix epoch in UTC. JSON form is RFC 3339.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Message)]
#[protolite(name = "google.protobuf.Timestamp")]
pub struct Timestamp {
    /// Seconds since 1970-01-01T00:00:00Z.
    #[protolite(tag = 1, int64)]
    pub seconds: i64,
    /// Non-negative fraction of a second.
    #[protolite(tag = 2, int32)]
    pub nanos: i32,
}

impl From<OffsetDateTime> for Timestamp {
    fn from(t: OffsetDateTime) -> Self {
        Self {
            seconds: t.unix_timestamp(),
            nanos: t.nanosecond() as i32,
        }
    }
}

impl TryFrom<Timestamp> for OffsetDateTime {
    type Error = time::error::ComponentRange;

    fn try_from(t: Timestamp) -> Result<Self, Self::Error> {
        let nanos = i128::from(t.seconds) * 1_000_000_000 + i128::from(t.nanos);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                seconds: d.as_secs() as i64,
                nanos: d.subsec_nanos() as i32,
            },
            Err(err) => {
                let d = err.duration();
                let (seconds, nanos) = (-(d.as_secs() as i64), d.subsec_nanos() as i32);
                if nanos == 0 {
                    Self { seconds, nanos }
                } else {
                    Self {
                        seconds: seconds - 1,
                        nanos: 1_000_000_000 - nanos,
                    }
                }
            }
        }
    }
}

impl MarshalProtoJson for Timestamp {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        s.write_time(self.seconds, self.nanos)
    }
}

impl UnmarshalProtoJson for Timestamp {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        (self.seconds, self.nanos) = s.read_time();
    }
}
