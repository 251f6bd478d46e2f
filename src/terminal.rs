#[cfg(unix)]
pub fn use_fancy() -> bool {
    unsafe {
        libc::isatty(/* stdout */ 1) == 1
    }
}

#[cfg(not(unix))]
pub fn use_fancy() -> bool {
    false
}
