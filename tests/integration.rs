mod integration {
    mod config_test;
    mod frame_test;
}
