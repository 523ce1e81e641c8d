use crate::buffer::find;
use atat::atat_derive::AtatResp;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Returns the value following the given label up to the end of the line, e.g. `+CIPDOMAIN:10.0.0.1\r\n`.
/// Surrounding quotes are stripped.
pub(crate) fn labeled_value<'r>(response: &'r [u8], label: &[u8]) -> Option<&'r [u8]> {
    let start = find(response, label)? + label.len();
    let value = &response[start..];
    let end = value.iter().position(|byte| *byte == b'\r').unwrap_or(value.len());

    Some(strip_quotes(&value[..end]))
}

/// Iterates over all `+<PREFIX>:<TYPE>,<VALUE>` lines, e.g. `+CIFSR:STAIP,"10.0.0.1"`
pub(crate) fn typed_values<'r>(response: &'r [u8], prefix: &'r [u8]) -> impl Iterator<Item = (&'r [u8], &'r [u8])> {
    response
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter_map(move |line| line.strip_prefix(prefix))
        .filter_map(|line| {
            let separator = line.iter().position(|byte| *byte == b',')?;
            Some((&line[..separator], strip_quotes(&line[separator + 1..])))
        })
}

fn strip_quotes(value: &[u8]) -> &[u8] {
    match value {
        [b'"', inner @ .., b'"'] => inner,
        _ => value,
    }
}
