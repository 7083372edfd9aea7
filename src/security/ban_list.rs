//! IP denylist consulted by the acceptor.
//!
//! The acceptor only ever asks [`BanFilter::is_banned`]. The list itself is
//! owned elsewhere (operator tooling, the file watcher) and may change while
//! connections are being accepted.

use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;

/// Read-only admission check.
pub trait BanFilter: Send + Sync + 'static {
    /// Whether connections from `addr` must be refused.
    fn is_banned(&self, addr: IpAddr) -> bool;
}

impl<T: BanFilter + ?Sized> BanFilter for Arc<T> {
    fn is_banned(&self, addr: IpAddr) -> bool {
        (**self).is_banned(addr)
    }
}

/// Admits everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl BanFilter for AllowAll {
    fn is_banned(&self, _addr: IpAddr) -> bool {
        false
    }
}

/// Refuses everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl BanFilter for DenyAll {
    fn is_banned(&self, _addr: IpAddr) -> bool {
        true
    }
}

/// Errors reading a ban-list file.
#[derive(Debug, Error)]
pub enum BanListError {
    #[error("failed to read ban list: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address {value:?} on line {line}")]
    InvalidAddress { line: usize, value: String },
}

/// Concurrent set of banned addresses.
#[derive(Debug, Default)]
pub struct BanList {
    entries: DashSet<IpAddr>,
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file with one address per line. `#` starts a comment.
    pub fn from_file(path: &Path) -> Result<Self, BanListError> {
        let list = Self::new();
        list.replace(read_ban_file(path)?);
        Ok(list)
    }

    pub fn ban(&self, addr: IpAddr) -> bool {
        self.entries.insert(addr)
    }

    pub fn unban(&self, addr: IpAddr) -> bool {
        self.entries.remove(&addr).is_some()
    }

    /// Swap in a new set of addresses.
    pub fn replace(&self, addrs: HashSet<IpAddr>) {
        self.entries.retain(|addr| addrs.contains(addr));
        for addr in addrs {
            self.entries.insert(addr);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<IpAddr> for BanList {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl BanFilter for BanList {
    fn is_banned(&self, addr: IpAddr) -> bool {
        // IPv4-mapped IPv6 peers are matched against their IPv4 form.
        match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => self.entries.contains(&IpAddr::V4(v4)) || self.entries.contains(&addr),
                None => self.entries.contains(&addr),
            },
            IpAddr::V4(_) => self.entries.contains(&addr),
        }
    }
}

/// Parse a ban-list file.
pub fn read_ban_file(path: &Path) -> Result<HashSet<IpAddr>, BanListError> {
    let content = fs::read_to_string(path)?;
    parse_ban_list(&content)
}

/// Parse ban-list text.
pub fn parse_ban_list(content: &str) -> Result<HashSet<IpAddr>, BanListError> {
    let mut addrs = HashSet::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = match raw.split_once('#') {
            Some((before, _)) => before,
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let addr = line.parse().map_err(|_| BanListError::InvalidAddress {
            line: idx + 1,
            value: line.to_string(),
        })?;
        addrs.insert(addr);
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use tempfile::NamedTempFile;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn fakes_answer_fixed() {
        assert!(!AllowAll.is_banned(ip("10.0.0.1")));
        assert!(DenyAll.is_banned(ip("10.0.0.1")));
    }

    #[test]
    fn ban_and_unban() {
        let list = BanList::new();
        assert!(!list.is_banned(ip("192.168.1.7")));

        assert!(list.ban(ip("192.168.1.7")));
        assert!(list.is_banned(ip("192.168.1.7")));
        assert!(!list.is_banned(ip("192.168.1.8")));

        assert!(list.unban(ip("192.168.1.7")));
        assert!(!list.is_banned(ip("192.168.1.7")));
        assert!(!list.unban(ip("192.168.1.7")));
    }

    #[test]
    fn replace_drops_stale_entries() {
        let list: BanList = [ip("1.1.1.1"), ip("2.2.2.2")].into_iter().collect();
        list.replace([ip("2.2.2.2"), ip("3.3.3.3")].into_iter().collect());

        assert!(!list.is_banned(ip("1.1.1.1")));
        assert!(list.is_banned(ip("2.2.2.2")));
        assert!(list.is_banned(ip("3.3.3.3")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn mapped_ipv6_matches_ipv4_entry() {
        let list: BanList = [ip("127.0.0.1")].into_iter().collect();
        let mapped = IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped());
        assert!(list.is_banned(mapped));
    }

    #[test]
    fn arc_forwards() {
        let list = Arc::new(BanList::new());
        list.ban(ip("8.8.8.8"));
        let shared: Arc<BanList> = Arc::clone(&list);
        assert!(shared.is_banned(ip("8.8.8.8")));
    }

    #[test]
    fn parses_comments_and_blank_lines() {
        let addrs = parse_ban_list("# header\n\n10.0.0.1\n  ::1  # loopback\n").unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(addrs.contains(&ip("10.0.0.1")));
        assert!(addrs.contains(&ip("::1")));
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_ban_list("10.0.0.1\nnot-an-ip\n").unwrap_err();
        assert!(matches!(err, BanListError::InvalidAddress { line: 2, ref value } if value == "not-an-ip"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "172.16.0.9").unwrap();

        let list = BanList::from_file(file.path()).unwrap();
        assert!(list.is_banned(ip("172.16.0.9")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BanList::from_file(Path::new("/nonexistent/ban.list")).unwrap_err();
        assert!(matches!(err, BanListError::Io(_)));
    }
}
