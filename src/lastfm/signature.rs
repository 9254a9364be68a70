use std::collections::BTreeMap;

/// Parameters Last.fm leaves out of the signature base string.
const UNSIGNED_PARAMS: [&str; 2] = ["format", "api_sig"];

/// Computes `api_sig`: parameters sorted by name, concatenated as
/// `name value` pairs without separators, secret appended, MD5 hex digest.
pub fn sign<'a, I>(params: I, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = params
        .into_iter()
        .filter(|(name, _)| !UNSIGNED_PARAMS.contains(name))
        .collect();

    let mut base = String::new();
    for (name, value) in sorted {
        base.push_str(name);
        base.push_str(value);
    }
    base.push_str(secret);

    format!("{:x}", md5::compute(base.as_bytes()))
}
