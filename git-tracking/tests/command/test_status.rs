use lib::testing::{make_git_with_remote_repo, GitWrapperWithRemoteRepo};

fn set_up() -> eyre::Result<GitWrapperWithRemoteRepo> {
    let wrapper = make_git_with_remote_repo()?;
    let GitWrapperWithRemoteRepo {
        temp_dir: _,
        original_repo,
        cloned_repo,
    } = &wrapper;
    original_repo.init_repo()?;
    original_repo.run(&["branch", "feature"])?;
    original_repo.clone_repo_into(cloned_repo, &[])?;
    cloned_repo.run(&["branch", "--track", "feature", "origin/feature"])?;
    cloned_repo.run(&["branch", "--no-track", "topic"])?;
    Ok(wrapper)
}

#[test]
fn test_status_lists_every_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo: _,
        cloned_repo,
    } = set_up()?;
    cloned_repo.commit_file("test1", 1)?;

    {
        let (stdout, stderr) = cloned_repo.tracking("status", &[])?;
        insta::assert_snapshot!(stderr, @"");
        insta::assert_snapshot!(stdout, @r###"
        * master  origin/master ahead +1
          feature origin/feature up to date
          topic   (untracked)
        "###);
    }

    {
        let (stdout, _stderr) = cloned_repo.tracking("status", &["--remote-only"])?;
        insta::assert_snapshot!(stdout, @r###"
        * master  origin/master ahead +1
          feature origin/feature up to date
        "###);
    }

    cloned_repo.run(&["config", "tracking.remoteOnly", "true"])?;
    {
        let (stdout, _stderr) = cloned_repo.tracking("status", &[])?;
        assert!(!stdout.contains("topic"), "stdout was: {stdout}");

        let (stdout, _stderr) = cloned_repo.tracking("status", &["--all"])?;
        assert!(stdout.contains("topic"), "stdout was: {stdout}");
    }

    Ok(())
}

#[test]
fn test_status_pull_fast_forwards_behind_branches() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = set_up()?;
    let upstream_oid = original_repo.commit_file("test1", 1)?;

    let (stdout, _stderr) = cloned_repo.tracking("status", &["--fetch", "--pull"])?;
    assert!(
        stdout.contains("* master  origin/master up to date (fast-forwarded)"),
        "stdout was: {stdout}"
    );
    assert!(
        stdout.contains("  feature origin/feature up to date\n"),
        "stdout was: {stdout}"
    );

    let (head, _stderr) = cloned_repo.run(&["rev-parse", "master"])?;
    assert_eq!(head.trim_end(), upstream_oid.to_string());
    let (branch, _stderr) = cloned_repo.run(&["symbolic-ref", "--short", "HEAD"])?;
    assert_eq!(branch, "master\n");

    Ok(())
}

#[test]
fn test_status_global_args_after_subcommand() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = set_up()?;
    cloned_repo.commit_file("test1", 1)?;

    let cloned_path = cloned_repo
        .repo_path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Could not convert repo path to string"))?;
    let (stdout, stderr) =
        original_repo.tracking("status", &["-C", cloned_path, "--color", "never"])?;
    insta::assert_snapshot!(stderr, @"");
    insta::assert_snapshot!(stdout, @r###"
    * master  origin/master ahead +1
      feature origin/feature up to date
      topic   (untracked)
    "###);

    let (stdout, _stderr) = original_repo.tracking("status", &["--quiet", "-C", cloned_path])?;
    insta::assert_snapshot!(stdout, @"");

    Ok(())
}
