use lib::testing::{make_git_with_remote_repo, GitRunOptions, GitWrapperWithRemoteRepo};

fn set_up_diverged() -> eyre::Result<GitWrapperWithRemoteRepo> {
    let wrapper = make_git_with_remote_repo()?;
    wrapper.original_repo.init_repo()?;
    wrapper
        .original_repo
        .clone_repo_into(&wrapper.cloned_repo, &[])?;
    wrapper.original_repo.commit_file("test1", 1)?;
    wrapper.cloned_repo.commit_file("test2", 2)?;
    Ok(wrapper)
}

#[test]
fn test_pull_rebases_linear_work() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo,
    } = set_up_diverged()?;

    let (stdout, _stderr) = cloned_repo.tracking("pull", &[])?;
    assert!(
        stdout.contains("Rebasing 1 commit from master onto origin/master"),
        "stdout was: {stdout}"
    );

    let (log, _stderr) = cloned_repo.run(&["log", "--format=%s"])?;
    insta::assert_snapshot!(log, @r###"
    create test2.txt
    create test1.txt
    create initial.txt
    "###);

    Ok(())
}

#[test]
fn test_pull_merge_flag() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo,
    } = set_up_diverged()?;

    let (stdout, _stderr) = cloned_repo.tracking("pull", &["--merge"])?;
    assert!(
        stdout.contains("Merging origin/master into master"),
        "stdout was: {stdout}"
    );

    let (merges, _stderr) = cloned_repo.run(&["rev-list", "--merges", "HEAD"])?;
    assert_eq!(merges.lines().count(), 1);

    Ok(())
}

#[test]
fn test_pull_prefer_rebase_config() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo,
    } = set_up_diverged()?;
    cloned_repo.run(&["config", "tracking.preferRebase", "false"])?;

    let (stdout, _stderr) = cloned_repo.tracking("pull", &[])?;
    assert!(
        stdout.contains("Merging origin/master into master"),
        "stdout was: {stdout}"
    );

    Ok(())
}

#[test]
fn test_pull_conflict() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    original_repo.commit_file_with_contents("test1", 1, "upstream contents\n")?;
    cloned_repo.commit_file_with_contents("test1", 2, "local contents\n")?;

    let (_stdout, stderr) = cloned_repo.tracking_with_options(
        "pull",
        &[],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    assert!(
        stderr.contains(
            "Stopped with conflicts while syncing master with origin/master; resolve them and run `git rebase --continue`."
        ),
        "stderr was: {stderr}"
    );

    let repo = cloned_repo.get_repo()?;
    assert_eq!(repo.get_current_operation_type(), Some("rebase"));

    Ok(())
}
