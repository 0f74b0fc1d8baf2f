use rtop::core::window::WindowManager;
use rtop::RcFile;

#[test]
fn rcfile_survives_a_disk_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rtoprc");

    let mut wins = WindowManager::new();
    wins.multi = true;
    wins.get_mut(0).max_tasks = 15;
    wins.get_mut(1).flags.show_colors = true;
    wins.get_mut(2).rename("Big");
    wins.select(1);

    let rc = RcFile::capture(&wins, 1.5, false);
    rc.save(&path).expect("save");

    let loaded = RcFile::load(&path).expect("load").expect("present");
    assert_eq!(loaded, rc);

    let mut fresh = WindowManager::new();
    loaded.apply(&mut fresh);
    assert!(fresh.multi);
    assert_eq!(fresh.current_index(), 1);
    assert_eq!(fresh.get(0).max_tasks, 15);
    assert!(fresh.get(1).flags.show_colors);
    assert_eq!(fresh.get(2).name, "Big");
}

#[test]
fn missing_rcfile_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let got = RcFile::load(&dir.path().join("nope")).expect("load");
    assert!(got.is_none());
}

#[test]
fn corrupt_rcfile_reports_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rtoprc");
    std::fs::write(&path, "not a config at all\n").expect("write");

    let err = RcFile::load(&path).unwrap_err().to_string();
    assert!(err.contains("rtoprc"), "error should name the file: {err}");
}
