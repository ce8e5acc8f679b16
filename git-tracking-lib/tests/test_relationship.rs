use tracking::core::relationship::{analyze, RelationshipSummary};
use tracking::core::tracking::{resolve, Tracking, TrackingRelationship};
use tracking::git::{ReferenceName, Vcs};
use tracking::testing::{make_git, make_git_with_remote_repo, GitWrapperWithRemoteRepo};

fn master_references() -> (ReferenceName, ReferenceName) {
    (
        ReferenceName::from("refs/heads/master"),
        ReferenceName::from("refs/remotes/origin/master"),
    )
}

#[test]
fn test_resolve_cloned_branch() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;
    cloned_repo.run(&["branch", "--no-track", "scratch"])?;

    cloned_repo.with_vcs(|vcs, _effects| {
        let expected = Tracking::Tracked(TrackingRelationship {
            branch_name: "master".to_owned(),
            remote_name: "origin".to_owned(),
            remote_branch_name: "master".to_owned(),
        });
        assert_eq!(resolve(vcs, "master")?, expected);
        assert_eq!(resolve(vcs, "master")?, expected);
        assert_eq!(resolve(vcs, "scratch")?, Tracking::Untracked);
        assert_eq!(vcs.current_branch()?, Some("master".to_owned()));
        Ok(())
    })?;

    Ok(())
}

#[test]
fn test_analyze_ahead_and_behind() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    original_repo.commit_file("test1", 1)?;
    original_repo.commit_file("test2", 2)?;
    cloned_repo.run(&["fetch", "origin"])?;
    cloned_repo.commit_file("test3", 3)?;

    let (local, remote) = master_references();
    let summary = cloned_repo.with_vcs(|vcs, _effects| Ok(analyze(vcs, &local, &remote)?))?;
    assert_eq!(
        summary,
        RelationshipSummary {
            ahead_count: 1,
            behind_count: 2,
            has_local_merge_commits: false,
            remote_ref_exists: true,
        }
    );

    Ok(())
}

#[test]
fn test_analyze_detects_local_merge_commits() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    cloned_repo.run(&["checkout", "-b", "side"])?;
    cloned_repo.commit_file("test1", 1)?;
    cloned_repo.run(&["checkout", "master"])?;
    cloned_repo.commit_file("test2", 2)?;
    cloned_repo.run(&["merge", "--no-ff", "--no-edit", "side"])?;

    let (local, remote) = master_references();
    let summary = cloned_repo.with_vcs(|vcs, _effects| Ok(analyze(vcs, &local, &remote)?))?;
    assert_eq!(summary.ahead_count, 3);
    assert_eq!(summary.behind_count, 0);
    assert!(summary.has_local_merge_commits);

    Ok(())
}

#[test]
fn test_analyze_missing_remote_ref() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    let summary = cloned_repo.with_vcs(|vcs, _effects| {
        Ok(analyze(
            vcs,
            &"refs/heads/master".into(),
            &"refs/remotes/origin/does-not-exist".into(),
        )?)
    })?;
    assert_eq!(summary, RelationshipSummary::missing_remote());

    Ok(())
}

#[test]
fn test_config_round_trip_through_facade() -> eyre::Result<()> {
    let GitWrapperWithRemoteRepo {
        temp_dir: _guard,
        original_repo,
        cloned_repo,
    } = make_git_with_remote_repo()?;
    original_repo.init_repo()?;
    original_repo.clone_repo_into(&cloned_repo, &[])?;

    cloned_repo.with_vcs(|vcs, _effects| {
        assert_eq!(vcs.get_config("tracking.doesNotExist")?, None);
        vcs.set_config("tracking.example", "value")?;
        assert_eq!(
            vcs.get_config("tracking.example")?,
            Some("value".to_owned())
        );
        vcs.unset_config("tracking.example")?;
        vcs.unset_config("tracking.example")?;
        assert_eq!(vcs.get_config("tracking.example")?, None);
        assert_eq!(vcs.remote_names()?, vec!["origin".to_owned()]);
        Ok(())
    })?;

    Ok(())
}

#[test]
fn test_resolve_local_upstream() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;
    git.run(&["branch", "--track", "topic", "master"])?;
    git.commit_file("test1", 1)?;

    git.with_vcs(|vcs, _effects| {
        let relationship = match resolve(vcs, "topic")? {
            Tracking::Tracked(relationship) => relationship,
            Tracking::Untracked => eyre::bail!("topic should track master"),
        };
        assert_eq!(relationship.remote_name, ".");
        assert_eq!(relationship.remote_branch_name, "master");
        assert_eq!(
            relationship.remote_reference(),
            ReferenceName::from("refs/heads/master")
        );

        let summary = analyze(
            vcs,
            &relationship.local_reference(),
            &relationship.remote_reference(),
        )?;
        assert_eq!(summary.ahead_count, 0);
        assert_eq!(summary.behind_count, 1);
        Ok(())
    })?;

    Ok(())
}
