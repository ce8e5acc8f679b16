use lib::testing::{make_git_with_remote_repo, GitRunOptions, GitWrapperWithRemoteRepo};

fn set_up() -> eyre::Result<GitWrapperWithRemoteRepo> {
    let wrapper = make_git_with_remote_repo()?;
    wrapper.original_repo.init_repo()?;
    wrapper.original_repo.run(&["branch", "feature"])?;
    wrapper.original_repo.commit_file("test1", 1)?;
    wrapper
        .original_repo
        .clone_repo_into(&wrapper.cloned_repo, &[])?;
    Ok(wrapper)
}

#[test]
fn test_track_adopts_existing_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;
    git.run(&["branch", "--no-track", "feature", "origin/feature"])?;

    {
        let (stdout, stderr) = git.tracking("track", &["origin", "feature"])?;
        insta::assert_snapshot!(stderr, @"");
        insta::assert_snapshot!(stdout, @r###"
        feature now tracks origin/feature
        "###);
    }

    {
        let (stdout, _stderr) = git.run(&["config", "branch.feature.remote"])?;
        assert_eq!(stdout, "origin\n");
        let (stdout, _stderr) = git.run(&["config", "branch.feature.merge"])?;
        assert_eq!(stdout, "refs/heads/feature\n");
    }

    {
        let (stdout, _stderr) = git.tracking("track", &["origin", "feature"])?;
        insta::assert_snapshot!(stdout, @r###"
        feature already tracks origin/feature
        "###);
    }

    Ok(())
}

#[test]
fn test_track_creates_missing_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;

    {
        let (stdout, _stderr) = git.tracking("track", &["origin", "feature"])?;
        insta::assert_snapshot!(stdout, @r###"
        git-tracking: running command: <git-executable> branch --no-track feature
        Created branch feature from HEAD, tracking origin/feature
        "###);
    }

    {
        let (stdout, _stderr) = git.run(&["rev-parse", "feature", "master"])?;
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
    }

    Ok(())
}

#[test]
fn test_track_refuses_to_replace_existing_upstream() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;

    {
        let (stdout, stderr) = git.tracking_with_options(
            "track",
            &["upstream"],
            &GitRunOptions {
                expected_exit_code: 1,
                ..Default::default()
            },
        )?;
        insta::assert_snapshot!(stdout, @"");
        insta::assert_snapshot!(stderr, @r###"
        error: branch 'master' already tracks 'origin/master', not 'upstream/master'
        hint: remove the existing relationship first: git branch --unset-upstream master
        "###);
    }

    {
        let (stdout, _stderr) = git.run(&["config", "branch.master.remote"])?;
        assert_eq!(stdout, "origin\n");
    }

    Ok(())
}

#[test]
fn test_track_reset_refuses_to_lose_commits() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;
    git.run(&["checkout", "-b", "topic"])?;
    git.commit_file("test2", 2)?;
    git.run(&["branch", "-m", "feature"])?;
    let (before, _stderr) = git.run(&["rev-parse", "feature"])?;

    let (_stdout, stderr) = git.tracking_with_options(
        "track",
        &["origin", "--reset"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    assert!(
        stderr.contains("would lose 2 commit(s) which only exist locally"),
        "stderr was: {stderr}"
    );

    let (after, _stderr) = git.run(&["rev-parse", "feature"])?;
    assert_eq!(before, after);
    git.run_with_options(
        &["config", "branch.feature.remote"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;

    Ok(())
}

#[test]
fn test_track_unknown_remote() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;

    let (_stdout, stderr) = git.tracking_with_options(
        "track",
        &["upstream", "feature"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stderr, @r###"
    error: remote 'upstream' is not configured (no remote.upstream.url)
    hint: add the remote first: git remote add upstream <url>
    "###);

    Ok(())
}

#[test]
fn test_track_missing_remote_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo: git,
    } = set_up()?;

    let (_stdout, stderr) = git.tracking_with_options(
        "track",
        &["origin", "topic", "--fetch"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stderr, @r###"
    error: remote branch 'refs/remotes/origin/topic' does not exist
    hint: fetch the remote with --fetch, or push the branch if it only exists locally
    hint: pass --new to track a branch which hasn't been pushed yet
    "###);

    let (stdout, _stderr) = git.tracking("track", &["origin", "topic", "--fetch", "--new"])?;
    insta::assert_snapshot!(stdout, @r###"
    git-tracking: running command: <git-executable> branch --no-track topic
    Created branch topic from HEAD, tracking origin/topic
    "###);

    Ok(())
}
