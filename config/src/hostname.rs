use std::io;

pub const HOSTNAME_TOKEN: &str = "%HOSTNAME%";

/// Host name as reported by `gethostname(2)`.
pub fn hostname() -> io::Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the pointer and length describe `buf`, which outlives the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
}

/// Substitutes every `%HOSTNAME%` in `prefix`.
pub fn expand_prefix(prefix: &str, hostname: &str) -> String {
    prefix.replace(HOSTNAME_TOKEN, hostname)
}
