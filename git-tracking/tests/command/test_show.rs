use lib::testing::{make_git_with_remote_repo, GitRunOptions, GitWrapperWithRemoteRepo};

#[test]
fn test_show_current_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.commit_file("test1", 1)?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    {
        let (stdout, _stderr) = cloned_repo.tracking("show", &[])?;
        insta::assert_snapshot!(stdout, @r###"
        * master origin/master up to date
        Next pull: nothing to pull
        "###);
    }

    cloned_repo.run(&["reset", "--hard", "HEAD~"])?;
    {
        let (stdout, _stderr) = cloned_repo.tracking("show", &[])?;
        insta::assert_snapshot!(stdout, @r###"
        * master origin/master behind -1
        Next pull: fast-forward by 1 commit
        "###);
    }

    cloned_repo.commit_file("test2", 2)?;
    {
        let (stdout, _stderr) = cloned_repo.tracking("show", &[])?;
        insta::assert_snapshot!(stdout, @r###"
        * master origin/master diverged (+1 -1)
        Next pull: rebase 1 local commit onto the upstream
        "###);
    }

    Ok(())
}

#[test]
fn test_show_other_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.run(&["branch", "feature"])?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    cloned_repo.run(&["branch", "--track", "feature", "origin/feature"])?;

    {
        let (stdout, _stderr) = cloned_repo.tracking("show", &["feature"])?;
        insta::assert_snapshot!(stdout, @r###"
          feature origin/feature up to date
        Next pull: nothing to pull
        "###);
    }

    cloned_repo.run(&["branch", "--no-track", "topic"])?;
    {
        let (stdout, stderr) = cloned_repo.tracking_with_options(
            "show",
            &["topic"],
            &GitRunOptions {
                expected_exit_code: 1,
                ..Default::default()
            },
        )?;
        insta::assert_snapshot!(stdout, @"");
        insta::assert_snapshot!(stderr, @r###"
        error: branch 'topic' does not track a remote branch
        hint: set up tracking with: git tracking track <remote> topic
        "###);
    }

    Ok(())
}
