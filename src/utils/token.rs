use rand::{distributions::Uniform, thread_rng, Rng};

const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const MEETING_ID_LEN: usize = 22;
pub const MEETING_PASSWORD_LEN: usize = 6;

fn random_lower_alnum(length: usize) -> String {
    let dist = Uniform::from(0..LOWER_ALNUM.len());
    thread_rng()
        .sample_iter(dist)
        .take(length)
        .map(|i| LOWER_ALNUM[i] as char)
        .collect()
}

pub fn generate_meeting_id() -> String {
    random_lower_alnum(MEETING_ID_LEN)
}

pub fn generate_meeting_password() -> String {
    random_lower_alnum(MEETING_PASSWORD_LEN)
}
