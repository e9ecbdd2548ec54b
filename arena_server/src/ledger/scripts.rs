const SAVE_USER_SCRIPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/scripts/SAVE_USER.lua"
));
const SAVE_USER_PAIR_SCRIPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/scripts/SAVE_USER_PAIR.lua"
));

pub fn save_user_script() -> &'static str {
    SAVE_USER_SCRIPT
}

pub fn save_user_pair_script() -> &'static str {
    SAVE_USER_PAIR_SCRIPT
}
