use lib::testing::{make_git_with_remote_repo, GitRunOptions, GitWrapperWithRemoteRepo};

#[test]
fn test_sync_up_to_date() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    {
        let (stdout, stderr) = cloned_repo.tracking("sync", &[])?;
        insta::assert_snapshot!(stderr, @"");
        insta::assert_snapshot!(stdout, @r###"
        master is up to date with origin/master
        "###);
    }

    cloned_repo.commit_file("test1", 1)?;
    {
        let (stdout, _stderr) = cloned_repo.tracking("sync", &[])?;
        insta::assert_snapshot!(stdout, @r###"
        master is up to date with origin/master (ahead by 1 commit)
        "###);
    }

    Ok(())
}

#[test]
fn test_sync_fetch_and_fast_forward() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    let upstream_oid = original_repo.commit_file("test1", 1)?;

    let (stdout, _stderr) = cloned_repo.tracking("sync", &["--fetch"])?;
    assert!(
        stdout.contains("git-tracking: running command: <git-executable> fetch origin master"),
        "stdout was: {stdout}"
    );
    assert!(
        stdout.contains("Fast-forwarding master to origin/master (1 new commit)"),
        "stdout was: {stdout}"
    );

    let (head, _stderr) = cloned_repo.run(&["rev-parse", "HEAD"])?;
    assert_eq!(head.trim_end(), upstream_oid.to_string());

    Ok(())
}

#[test]
fn test_sync_fetch_first_config() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    original_repo.commit_file("test1", 1)?;

    {
        let (stdout, _stderr) = cloned_repo.tracking("sync", &[])?;
        insta::assert_snapshot!(stdout, @r###"
        master is up to date with origin/master
        "###);
    }

    cloned_repo.run(&["config", "tracking.fetchFirst", "true"])?;
    {
        let (stdout, _stderr) = cloned_repo.tracking("sync", &[])?;
        assert!(stdout.contains("Fast-forwarding master"), "stdout was: {stdout}");
    }

    Ok(())
}

#[test]
fn test_sync_diverged_changes_nothing() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    original_repo.commit_file("test1", 1)?;
    let local_oid = cloned_repo.commit_file("test2", 2)?;
    cloned_repo.run(&["fetch", "origin"])?;

    {
        let (stdout, stderr) = cloned_repo.tracking_with_options(
            "sync",
            &[],
            &GitRunOptions {
                expected_exit_code: 1,
                ..Default::default()
            },
        )?;
        insta::assert_snapshot!(stdout, @"");
        insta::assert_snapshot!(stderr, @r###"
        error: branch 'master' has diverged (ahead 1, behind 1)
        hint: use `git tracking pull` to rebase or merge instead
        "###);
    }

    let (head, _stderr) = cloned_repo.run(&["rev-parse", "HEAD"])?;
    assert_eq!(head.trim_end(), local_oid.to_string());

    Ok(())
}

#[test]
fn test_sync_not_on_tracked_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    cloned_repo.run(&["checkout", "-b", "topic"])?;
    {
        let (_stdout, stderr) = cloned_repo.tracking_with_options(
            "sync",
            &[],
            &GitRunOptions {
                expected_exit_code: 1,
                ..Default::default()
            },
        )?;
        insta::assert_snapshot!(stderr, @r###"
        error: branch 'topic' does not track a remote branch
        hint: set up tracking with: git tracking track <remote> topic
        "###);
    }

    cloned_repo.run(&["checkout", "--detach"])?;
    {
        let (_stdout, stderr) = cloned_repo.tracking_with_options(
            "sync",
            &[],
            &GitRunOptions {
                expected_exit_code: 1,
                ..Default::default()
            },
        )?;
        insta::assert_snapshot!(stderr, @r###"
        error: HEAD is not on a branch
        hint: check out a branch first: git checkout <branch>
        "###);
    }

    Ok(())
}

#[test]
fn test_sync_quiet() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    original_repo.commit_file("test1", 1)?;
    cloned_repo.commit_file("test2", 2)?;
    cloned_repo.run(&["fetch", "origin"])?;

    let (stdout, stderr) = cloned_repo.tracking_with_options(
        "sync",
        &["--quiet"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stdout, @"");
    insta::assert_snapshot!(stderr, @"");

    Ok(())
}
