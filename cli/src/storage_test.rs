use super::*;
use meal_planner::session::{ACCESS_TOKEN_KEY, Session};

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("meal-planner-cli-{}", uuid::Uuid::new_v4())).join("session.json")
}

#[test]
fn missing_file_reads_as_empty() {
    let storage = FileStorage::new(temp_path());
    assert_eq!(storage.get_item(ACCESS_TOKEN_KEY), None);
}

#[test]
fn set_item_creates_file_and_persists_across_instances() {
    let path = temp_path();
    FileStorage::new(&path).set_item(ACCESS_TOKEN_KEY, "jwt-1");

    let reopened = FileStorage::new(&path);
    assert_eq!(reopened.get_item(ACCESS_TOKEN_KEY), Some("jwt-1".to_owned()));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn remove_item_keeps_other_keys() {
    let path = temp_path();
    let storage = FileStorage::new(&path);
    storage.set_item(ACCESS_TOKEN_KEY, "jwt-1");
    storage.set_item("other", "kept");
    storage.remove_item(ACCESS_TOKEN_KEY);

    assert_eq!(storage.get_item(ACCESS_TOKEN_KEY), None);
    assert_eq!(storage.get_item("other"), Some("kept".to_owned()));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn corrupt_file_reads_as_empty() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "not json").unwrap();

    assert_eq!(FileStorage::new(&path).get_item(ACCESS_TOKEN_KEY), None);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn session_over_file_storage_signs_in_and_out() {
    let path = temp_path();
    let session = Session::new(FileStorage::new(&path));
    session.sign_in("jwt-2");
    assert!(Session::new(FileStorage::new(&path)).is_authenticated());
    session.sign_out();
    assert!(!Session::new(FileStorage::new(&path)).is_authenticated());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[cfg(unix)]
#[test]
fn token_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_path();
    FileStorage::new(&path).set_item(ACCESS_TOKEN_KEY, "jwt-1");

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[cfg(unix)]
#[test]
fn rewrite_tightens_existing_world_readable_file() {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{}").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    FileStorage::new(&path).set_item(ACCESS_TOKEN_KEY, "jwt-1");

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn default_path_prefers_config_home_then_home() {
    assert_eq!(
        token_path_from(Some("/cfg".into()), Some("/home/ana".into())),
        Some(PathBuf::from("/cfg/meal-planner/session.json"))
    );
    assert_eq!(
        token_path_from(Some("".into()), Some("/home/ana".into())),
        Some(PathBuf::from("/home/ana/.config/meal-planner/session.json"))
    );
    assert_eq!(token_path_from(None, None), None);
}
