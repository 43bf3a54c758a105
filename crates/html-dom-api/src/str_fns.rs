use memchr::memmem;

pub(crate) fn substr(s: &[u8], offset: usize, length: usize) -> &[u8] {
    &s[offset..offset + length]
}

pub(crate) fn strpos(s: &[u8], pattern: &[u8], offset: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(offset);
    }

    if offset + pattern.len() > s.len() {
        return None;
    }

    memmem::find(&s[offset..], pattern).map(|at| at + offset)
}

pub(crate) fn stripos(s: &[u8], pattern: &[u8], offset: usize) -> Option<usize> {
    let p_len = pattern.len();

    if p_len == 0 {
        return Some(offset);
    }

    if offset + p_len > s.len() {
        return None;
    }

    let lower = pattern[0].to_ascii_lowercase();
    let upper = pattern[0].to_ascii_uppercase();
    let last_start = s.len() - p_len;

    let mut at = offset;
    while at <= last_start {
        match memchr::memchr2(lower, upper, &s[at..=last_start]) {
            Some(found) => at += found,
            None => return None,
        }

        if pattern.eq_ignore_ascii_case(&s[at..at + p_len]) {
            return Some(at);
        }

        at += 1;
    }

    None
}
