use crate::error::Error;

/// Capability check performed once before any raw socket is opened
pub trait PrivilegeCheck {
    /// Return `true` if the process may open raw sockets
    fn is_elevated(&self) -> bool;
}

/// Checks the effective user of the running process
///
/// On unix the process must run as root. On Linux a process holding `CAP_NET_RAW`, for example a
/// binary granted it with `setcap`, passes as well. Other platforms are not checked up front and
/// rely on the operating system refusing the raw socket instead.
#[derive(Debug, Default, Copy, Clone)]
pub struct EffectiveUser;

impl PrivilegeCheck for EffectiveUser {
    #[cfg(unix)]
    fn is_elevated(&self) -> bool {
        // Safe: geteuid cannot fail and touches no memory
        (unsafe { libc::geteuid() == 0 }) || holds_net_raw()
    }

    #[cfg(not(unix))]
    fn is_elevated(&self) -> bool {
        true
    }
}

#[cfg(target_os = "linux")]
fn holds_net_raw() -> bool {
    match std::fs::read_to_string("/proc/self/status") {
        Ok(status) => effective_caps_allow_raw(&status),
        Err(e) => {
            debug!("Could not read process capabilities: {}", e);
            false
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn holds_net_raw() -> bool {
    false
}

/// Look for `CAP_NET_RAW` in the `CapEff` line of a `/proc/<pid>/status` listing
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn effective_caps_allow_raw(status: &str) -> bool {
    const CAP_NET_RAW: u64 = 1 << 13;

    status
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|mask| u64::from_str_radix(mask.trim(), 16).ok())
        .map_or(false, |mask| mask & CAP_NET_RAW != 0)
}

/// Fail early if the process lacks the privileges for raw sockets
///
/// # Errors
///
/// Returns `PermissionDenied` if the check does not pass.
pub fn ensure(check: &dyn PrivilegeCheck) -> Result<(), Error> {
    if check.is_elevated() {
        trace!("Privilege check passed");
        Ok(())
    } else {
        Err(Error::PermissionDenied(
            "this application requires elevated privileges to open raw sockets".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl PrivilegeCheck for Fixed {
        fn is_elevated(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn elevated_process_passes() {
        assert!(ensure(&Fixed(true)).is_ok());
    }

    #[test]
    fn unprivileged_process_is_refused() {
        assert!(matches!(
            ensure(&Fixed(false)),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn root_is_always_elevated() {
        if unsafe { libc::geteuid() } == 0 {
            assert!(EffectiveUser.is_elevated());
        }
    }

    #[test]
    fn net_raw_capability_is_enough() {
        let setcap = "Name:\tping-sweep\nCapPrm:\t0000000000002000\nCapEff:\t0000000000002000\n";
        assert!(effective_caps_allow_raw(setcap));

        let full = "CapEff:\t000001ffffffffff\n";
        assert!(effective_caps_allow_raw(full));
    }

    #[test]
    fn missing_net_raw_capability() {
        // Permitted but not effective does not count
        let permitted = "CapPrm:\t0000000000002000\nCapEff:\t0000000000000000\n";
        assert!(!effective_caps_allow_raw(permitted));

        let net_admin_only = "CapEff:\t0000000000001000\n";
        assert!(!effective_caps_allow_raw(net_admin_only));

        assert!(!effective_caps_allow_raw("Name:\tping-sweep\n"));
        assert!(!effective_caps_allow_raw("CapEff:\tzz\n"));
    }
}
