mod command {
    mod test_pull;
    mod test_show;
    mod test_status;
    mod test_sync;
    mod test_track;
}
