//! Purpose: Model protocol versions and the pre-flight version gate.
//! Exports: `ProtocolVersion`, `VersionNegotiator`, `FixedVersion`, `check`.
//! Role: Rejects operations the negotiated session cannot serve before any encoding or I/O.
//! Invariants: Version ordering is the declaration order of `ProtocolVersion`.
//! Invariants: `check` is pure and depends only on the descriptor and the negotiated version.
use super::error::{Error, ErrorKind};
use super::operation::OperationDescriptor;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ProtocolVersion {
    Exchange2007Sp1,
    Exchange2010,
    Exchange2010Sp1,
    Exchange2010Sp2,
    Exchange2013,
    Exchange2013Sp1,
    Exchange2016,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 7] = [
        ProtocolVersion::Exchange2007Sp1,
        ProtocolVersion::Exchange2010,
        ProtocolVersion::Exchange2010Sp1,
        ProtocolVersion::Exchange2010Sp2,
        ProtocolVersion::Exchange2013,
        ProtocolVersion::Exchange2013Sp1,
        ProtocolVersion::Exchange2016,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::Exchange2007Sp1 => "Exchange2007_SP1",
            ProtocolVersion::Exchange2010 => "Exchange2010",
            ProtocolVersion::Exchange2010Sp1 => "Exchange2010_SP1",
            ProtocolVersion::Exchange2010Sp2 => "Exchange2010_SP2",
            ProtocolVersion::Exchange2013 => "Exchange2013",
            ProtocolVersion::Exchange2013Sp1 => "Exchange2013_SP1",
            ProtocolVersion::Exchange2016 => "Exchange2016",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProtocolVersion::ALL
            .into_iter()
            .find(|version| version.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown protocol version: {value}"))
                    .with_hint("Use a value like Exchange2010_SP2 or Exchange2013.")
            })
    }
}

/// Source of the version negotiated with the remote side.
pub trait VersionNegotiator {
    fn negotiated_version(&self) -> ProtocolVersion;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedVersion(pub ProtocolVersion);

impl VersionNegotiator for FixedVersion {
    fn negotiated_version(&self) -> ProtocolVersion {
        self.0
    }
}

impl<V: VersionNegotiator + ?Sized> VersionNegotiator for &V {
    fn negotiated_version(&self) -> ProtocolVersion {
        (**self).negotiated_version()
    }
}

pub fn check(descriptor: &OperationDescriptor, negotiated: ProtocolVersion) -> Result<(), Error> {
    if negotiated < descriptor.min_version {
        return Err(Error::new(ErrorKind::UnsupportedVersion)
            .with_operation(descriptor.name)
            .with_message(format!(
                "{} requires {} or later; session negotiated {}",
                descriptor.name, descriptor.min_version, negotiated
            )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ProtocolVersion, check};
    use crate::core::catalog;
    use crate::core::error::ErrorKind;

    #[test]
    fn ordering_follows_release_order() {
        assert!(ProtocolVersion::Exchange2007Sp1 < ProtocolVersion::Exchange2010);
        assert!(ProtocolVersion::Exchange2010Sp2 < ProtocolVersion::Exchange2013);
        assert!(ProtocolVersion::Exchange2013Sp1 < ProtocolVersion::Exchange2016);
    }

    #[test]
    fn parse_accepts_wire_names_case_insensitively() {
        let version: ProtocolVersion = "exchange2010_sp1".parse().expect("version");
        assert_eq!(version, ProtocolVersion::Exchange2010Sp1);
        let err = "Exchange2003".parse::<ProtocolVersion>().expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn gate_accepts_exactly_when_negotiated_is_at_least_minimum() {
        for descriptor in catalog::ALL {
            for negotiated in ProtocolVersion::ALL {
                let result = check(descriptor, negotiated);
                if negotiated < descriptor.min_version {
                    let err = result.expect_err("rejected");
                    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
                    assert_eq!(err.operation(), Some(descriptor.name));
                } else {
                    result.expect("accepted");
                }
            }
        }
    }
}
