//! Establish or repair the tracking relationship for a branch.
//!
//! The provisioner inspects the existing state of the local branch and picks
//! exactly one of these transitions:
//!
//! | Local branch                         | Action                              |
//! |--------------------------------------|-------------------------------------|
//! | tracks the requested upstream        | nothing ([`ProvisionAction::AlreadyTracking`]) |
//! | tracks a different upstream          | refuse ([`Error::TrackingConflict`]) |
//! | tracks nothing                       | write config ([`ProvisionAction::Adopted`]) |
//! | tracks nothing, rebind requested     | replace it with the upstream ([`ProvisionAction::Rebound`]) |
//! | does not exist                       | create, then write config ([`ProvisionAction::Created`]) |
//!
//! Replacing a branch is only done after verifying that no commit on the local
//! branch is missing from the upstream.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::core::effects::{Effects, OperationType};
use crate::core::error::{Error, Result};
use crate::core::tracking::{resolve, Tracking};
use crate::git::{ReferenceName, Vcs, LOCAL_REMOTE_NAME};

/// Options for [`provision`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Where to create the branch if it doesn't exist. Defaults to `HEAD`.
    pub start_point: Option<String>,

    /// Add an empty commit to a newly-created branch recording where it
    /// started.
    pub create_marker_commit: bool,

    /// Replace an existing untracked branch with the upstream's tip, as long
    /// as that loses no commits.
    pub rebind: bool,

    /// Allow tracking a remote branch which doesn't exist yet (for example,
    /// because it will be created by the first push).
    pub allow_missing_remote_branch: bool,

    /// Fetch the remote branch before inspecting it.
    pub fetch: bool,
}

/// Which transition [`provision`] performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionAction {
    /// The branch already tracked the requested upstream.
    AlreadyTracking,

    /// Tracking configuration was written for an existing branch.
    Adopted,

    /// A new branch was created and configured.
    Created,

    /// An existing branch was recreated at the upstream's tip.
    Rebound,
}

/// The result of [`provision`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Whether a local branch ref was created (or recreated).
    pub created: bool,

    /// Where the branch now starts from.
    pub from: ReferenceName,

    /// The transition performed.
    pub action: ProvisionAction,
}

fn check_remote_known(vcs: &dyn Vcs, remote_name: &str) -> Result<()> {
    if remote_name == LOCAL_REMOTE_NAME {
        return Ok(());
    }
    match vcs.get_config(&format!("remote.{remote_name}.url"))? {
        Some(_) => Ok(()),
        None => Err(Error::RemoteUnknown {
            remote_name: remote_name.to_owned(),
        }),
    }
}

/// Make `branch_name` track the branch of the same name on `remote_name`.
#[instrument(skip(vcs, effects))]
pub fn provision(
    vcs: &dyn Vcs,
    effects: &Effects,
    remote_name: &str,
    branch_name: &str,
    options: &ProvisionOptions,
) -> Result<ProvisionOutcome> {
    let (_effects, _progress) =
        effects.start_operation(OperationType::ProvisionTracking(Arc::new(branch_name.to_owned())));

    let local_reference = ReferenceName::local_branch(branch_name);
    let remote_reference = ReferenceName::remote_tracking(remote_name, branch_name);
    let merge_reference = ReferenceName::local_branch(branch_name);
    let local_exists = vcs.ref_exists(&local_reference)?;

    if local_exists {
        if let Tracking::Tracked(existing) = resolve(vcs, branch_name)? {
            if existing.remote_name == remote_name && existing.remote_branch_name == branch_name {
                return Ok(ProvisionOutcome {
                    created: false,
                    from: local_reference,
                    action: ProvisionAction::AlreadyTracking,
                });
            }
            return Err(Error::TrackingConflict {
                branch_name: branch_name.to_owned(),
                existing_remote: existing.remote_name,
                existing_branch: existing.remote_branch_name,
                requested_remote: remote_name.to_owned(),
                requested_branch: branch_name.to_owned(),
            });
        }
    }

    check_remote_known(vcs, remote_name)?;
    if options.fetch && remote_name != LOCAL_REMOTE_NAME {
        if vcs.remote_has_branch(remote_name, branch_name)? {
            vcs.fetch(remote_name, Some(branch_name))?;
        } else {
            debug!(?remote_name, ?branch_name, "Remote has no such branch, not fetching");
        }
    }

    let remote_exists = vcs.ref_exists(&remote_reference)?;
    let remote_required = options.rebind && local_exists;
    if !remote_exists && (remote_required || !options.allow_missing_remote_branch) {
        return Err(Error::RemoteRefMissing {
            reference_name: remote_reference.to_string(),
        });
    }

    if local_exists {
        if options.rebind {
            rebind(
                vcs,
                remote_name,
                branch_name,
                &local_reference,
                &remote_reference,
            )
        } else {
            vcs.set_tracking(branch_name, remote_name, &merge_reference)?;
            Ok(ProvisionOutcome {
                created: false,
                from: local_reference,
                action: ProvisionAction::Adopted,
            })
        }
    } else {
        create(vcs, remote_name, branch_name, &merge_reference, options)
    }
}

fn create(
    vcs: &dyn Vcs,
    remote_name: &str,
    branch_name: &str,
    merge_reference: &ReferenceName,
    options: &ProvisionOptions,
) -> Result<ProvisionOutcome> {
    let start_point = options.start_point.as_deref();
    vcs.create_branch(branch_name, start_point)?;
    if let Err(err) = vcs.set_tracking(branch_name, remote_name, merge_reference) {
        if let Err(delete_err) = vcs.delete_branch(branch_name, true) {
            warn!(
                ?delete_err,
                ?branch_name,
                "Could not remove branch after failing to configure tracking"
            );
        }
        return Err(err);
    }

    if options.create_marker_commit {
        let message = format!(
            "Start branch {branch_name} from {}",
            start_point.unwrap_or("HEAD")
        );
        vcs.create_marker_commit(branch_name, &message)?;
    }

    Ok(ProvisionOutcome {
        created: true,
        from: ReferenceName::from(start_point.unwrap_or("HEAD")),
        action: ProvisionAction::Created,
    })
}

fn rebind(
    vcs: &dyn Vcs,
    remote_name: &str,
    branch_name: &str,
    local_reference: &ReferenceName,
    remote_reference: &ReferenceName,
) -> Result<ProvisionOutcome> {
    let num_commits = vcs.commits_only_in(local_reference, remote_reference)?;
    if num_commits > 0 {
        return Err(Error::WouldLoseCommits {
            branch_name: branch_name.to_owned(),
            remote_reference_name: remote_reference.to_string(),
            num_commits,
        });
    }

    let merge_reference = ReferenceName::local_branch(branch_name);
    if vcs.ref_target(local_reference)? == vcs.ref_target(remote_reference)? {
        vcs.set_tracking(branch_name, remote_name, &merge_reference)?;
        return Ok(ProvisionOutcome {
            created: false,
            from: remote_reference.clone(),
            action: ProvisionAction::Adopted,
        });
    }

    let is_current = vcs.current_branch()?.as_deref() == Some(branch_name);
    if is_current {
        vcs.checkout_detached(remote_reference.as_str())?;
    }
    vcs.delete_branch(branch_name, true)?;
    vcs.create_branch(branch_name, Some(remote_reference.as_str()))?;
    vcs.set_tracking(branch_name, remote_name, &merge_reference)?;
    if is_current {
        vcs.checkout(branch_name)?;
    }

    Ok(ProvisionOutcome {
        created: true,
        from: remote_reference.clone(),
        action: ProvisionAction::Rebound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::formatting::Glyphs;
    use crate::testing::FakeVcs;

    fn effects() -> Effects {
        Effects::new_suppress_for_test(Glyphs::text())
    }

    fn fake_with_origin() -> FakeVcs {
        let vcs = FakeVcs::new("master");
        vcs.set_config_value("remote.origin.url", "file:///remote");
        vcs
    }

    #[test]
    fn test_already_tracking_is_a_no_op() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        vcs.add_ref("refs/heads/feature");
        vcs.set_config_value("branch.feature.remote", "origin");
        vcs.set_config_value("branch.feature.merge", "refs/heads/feature");

        let outcome = provision(&vcs, &effects(), "origin", "feature", &Default::default())?;
        assert_eq!(outcome.action, ProvisionAction::AlreadyTracking);
        assert!(!outcome.created);
        assert_eq!(vcs.mutations(), Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn test_conflicting_relationship_is_refused() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        vcs.add_ref("refs/heads/feature");
        vcs.set_config_value("branch.feature.remote", "upstream");
        vcs.set_config_value("branch.feature.merge", "refs/heads/feature");

        let result = provision(&vcs, &effects(), "origin", "feature", &Default::default());
        assert!(matches!(result, Err(Error::TrackingConflict { .. })));
        assert_eq!(vcs.mutations(), Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn test_unknown_remote() -> eyre::Result<()> {
        let vcs = FakeVcs::new("master");
        let result = provision(&vcs, &effects(), "nowhere", "feature", &Default::default());
        assert!(matches!(
            result,
            Err(Error::RemoteUnknown { remote_name }) if remote_name == "nowhere"
        ));
        Ok(())
    }

    #[test]
    fn test_missing_remote_branch() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        let result = provision(&vcs, &effects(), "origin", "feature", &Default::default());
        assert!(matches!(result, Err(Error::RemoteRefMissing { .. })));

        let outcome = provision(
            &vcs,
            &effects(),
            "origin",
            "feature",
            &ProvisionOptions {
                allow_missing_remote_branch: true,
                ..Default::default()
            },
        )?;
        assert_eq!(outcome.action, ProvisionAction::Created);
        Ok(())
    }

    #[test]
    fn test_fetch_skipped_when_remote_lacks_branch() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        let options = ProvisionOptions {
            fetch: true,
            ..Default::default()
        };
        let result = provision(&vcs, &effects(), "origin", "feature", &options);
        assert!(matches!(result, Err(Error::RemoteRefMissing { .. })));
        assert_eq!(vcs.mutations(), Vec::<String>::new());

        provision(
            &vcs,
            &effects(),
            "origin",
            "feature",
            &ProvisionOptions {
                allow_missing_remote_branch: true,
                ..options
            },
        )?;
        assert!(!vcs.mutations().iter().any(|call| call.starts_with("fetch")));
        Ok(())
    }

    #[test]
    fn test_adopt_writes_config_only() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        vcs.add_ref("refs/heads/feature");
        vcs.add_ref("refs/remotes/origin/feature");

        let outcome = provision(&vcs, &effects(), "origin", "feature", &Default::default())?;
        assert_eq!(outcome.action, ProvisionAction::Adopted);
        assert_eq!(
            vcs.mutations(),
            vec![
                "set_config branch.feature.remote origin".to_owned(),
                "set_config branch.feature.merge refs/heads/feature".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_create_then_configure() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        vcs.add_ref("refs/remotes/origin/feature");

        let outcome = provision(
            &vcs,
            &effects(),
            "origin",
            "feature",
            &ProvisionOptions {
                start_point: Some("origin/feature".to_owned()),
                create_marker_commit: true,
                ..Default::default()
            },
        )?;
        assert_eq!(
            outcome,
            ProvisionOutcome {
                created: true,
                from: "origin/feature".into(),
                action: ProvisionAction::Created,
            }
        );
        assert_eq!(
            vcs.mutations(),
            vec![
                "create_branch feature origin/feature".to_owned(),
                "set_config branch.feature.remote origin".to_owned(),
                "set_config branch.feature.merge refs/heads/feature".to_owned(),
                "create_marker_commit feature".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_rebind_refuses_to_lose_commits() -> eyre::Result<()> {
        let vcs = fake_with_origin();
        vcs.add_ref("refs/heads/feature");
        vcs.add_ref("refs/remotes/origin/feature");
        vcs.set_commits_only_in("refs/heads/feature", "refs/remotes/origin/feature", 2);

        let result = provision(
            &vcs,
            &effects(),
            "origin",
            "feature",
            &ProvisionOptions {
                rebind: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(Error::WouldLoseCommits { num_commits: 2, .. })
        ));
        assert_eq!(vcs.mutations(), Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn test_rebind_current_branch() -> eyre::Result<()> {
        let vcs = FakeVcs::new("feature");
        vcs.set_config_value("remote.origin.url", "file:///remote");
        vcs.add_ref("refs/heads/feature");
        vcs.add_ref_at(
            "refs/remotes/origin/feature",
            "1111111111111111111111111111111111111111",
        );

        let outcome = provision(
            &vcs,
            &effects(),
            "origin",
            "feature",
            &ProvisionOptions {
                rebind: true,
                ..Default::default()
            },
        )?;
        assert_eq!(outcome.action, ProvisionAction::Rebound);
        assert_eq!(
            vcs.mutations(),
            vec![
                "checkout_detached refs/remotes/origin/feature".to_owned(),
                "delete_branch feature force".to_owned(),
                "create_branch feature refs/remotes/origin/feature".to_owned(),
                "set_config branch.feature.remote origin".to_owned(),
                "set_config branch.feature.merge refs/heads/feature".to_owned(),
                "checkout feature".to_owned(),
            ]
        );
        Ok(())
    }
}
