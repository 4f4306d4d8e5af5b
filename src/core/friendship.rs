//! Friendship graph - Invitations and the friend relation they produce.
//!
//! A user invites another by email. The invitation stays pending until the
//! recipient accepts it, at which point both directed friend edges are written
//! in the same database transaction as the status change. Only friends can be
//! billed together, see [`crate::core::expense::create_expense`].

use crate::{
    core::user::{get_user_by_email, require_user},
    entities::{Friendship, Invitation, User, friendship, invitation, user},
    errors::{Error, Result, trace_failure},
};
use sea_orm::{Condition, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Checks whether `friend_id` is in the friend set of `user_id`.
///
/// This is a primary-key lookup of the directed edge `user_id -> friend_id`.
pub async fn is_friend<C>(db: &C, user_id: i64, friend_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Friendship::find_by_id((user_id, friend_id))
        .one(db)
        .await?
        .is_some())
}

/// Returns the ids of every friend of `user_id`, in ascending order.
pub async fn get_friend_ids<C>(db: &C, user_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let edges = Friendship::find()
        .filter(friendship::Column::UserId.eq(user_id))
        .order_by_asc(friendship::Column::FriendId)
        .all(db)
        .await?;
    Ok(edges.into_iter().map(|edge| edge.friend_id).collect())
}

/// Lists the friends of a user, ordered by id.
#[instrument(skip(db))]
pub async fn list_friends<C>(db: &C, user_id: i64) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    let result: Result<Vec<user::Model>> = async {
        require_user(db, user_id).await?;
        let friend_ids = get_friend_ids(db, user_id).await?;
        if friend_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::find()
            .filter(user::Column::Id.is_in(friend_ids))
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?)
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Lists invitations the user sent or received, newest first.
#[instrument(skip(db))]
pub async fn list_invitations(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<invitation::Model>> {
    let result: Result<Vec<invitation::Model>> = async {
        require_user(db, user_id).await?;
        Ok(Invitation::find()
            .filter(
                Condition::any()
                    .add(invitation::Column::FromUserId.eq(user_id))
                    .add(invitation::Column::ToUserId.eq(user_id)),
            )
            .order_by_desc(invitation::Column::CreatedAt)
            .order_by_desc(invitation::Column::Id)
            .all(db)
            .await?)
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Finds the pending invitation between two users, in either direction.
async fn find_pending_between<C>(db: &C, a: i64, b: i64) -> Result<Option<invitation::Model>>
where
    C: ConnectionTrait,
{
    Invitation::find()
        .filter(invitation::Column::IsAccepted.eq(false))
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(invitation::Column::FromUserId.eq(a))
                        .add(invitation::Column::ToUserId.eq(b)),
                )
                .add(
                    Condition::all()
                        .add(invitation::Column::FromUserId.eq(b))
                        .add(invitation::Column::ToUserId.eq(a)),
                ),
        )
        .one(db)
        .await
        .map_err(Into::into)
}

/// Sends a friend invitation from `from_user_id` to the user registered with `to_email`.
///
/// Rejected when the recipient does not exist, is the sender, is already a
/// friend, or when a pending invitation exists between the two users in either
/// direction. Two concurrent sends between the same users, in either
/// direction, are settled by the pending invitation unique index: the loser
/// gets [`Error::DuplicateInvitation`].
#[instrument(skip(db))]
pub async fn send_invitation(
    db: &DatabaseConnection,
    from_user_id: i64,
    to_email: &str,
) -> Result<invitation::Model> {
    let result: Result<invitation::Model> = async {
        let from_user = require_user(db, from_user_id).await?;
        let to_user = get_user_by_email(db, to_email)
            .await?
            .ok_or_else(|| Error::UserNotFound {
                identifier: to_email.trim().to_string(),
            })?;

        if from_user.id == to_user.id {
            return Err(Error::SelfInvitation);
        }
        if is_friend(db, from_user.id, to_user.id).await? {
            return Err(Error::AlreadyFriends {
                user_id: from_user.id,
                other_id: to_user.id,
            });
        }
        if let Some(pending) = find_pending_between(db, from_user.id, to_user.id).await? {
            return Err(Error::DuplicateInvitation {
                from_user_id: pending.from_user_id,
                to_user_id: pending.to_user_id,
            });
        }

        let model = invitation::ActiveModel {
            from_user_id: Set(from_user.id),
            to_user_id: Set(to_user.id),
            is_accepted: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        model.insert(db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateInvitation {
                from_user_id: from_user.id,
                to_user_id: to_user.id,
            },
            _ => Error::Database(e),
        })
    }
    .await;

    let invitation = result.inspect_err(trace_failure)?;
    info!(invitation_id = invitation.id, to_user_id = invitation.to_user_id, "Invitation sent");
    Ok(invitation)
}

/// Accepts a pending invitation on behalf of its recipient.
///
/// The status change and both friend edges are written in one database
/// transaction; an error at any point drops the transaction and nothing is
/// persisted. Accepting is not idempotent: a second call fails with
/// [`Error::AlreadyResolved`]. `accept == false` is rejected with
/// [`Error::InvalidAcceptValue`] since invitations cannot be declined.
/// Friend edges that already exist are kept as they are.
#[instrument(skip(db))]
pub async fn accept_invitation(
    db: &DatabaseConnection,
    invitation_id: i64,
    acting_user_id: i64,
    accept: bool,
) -> Result<invitation::Model> {
    use sea_orm::sea_query::{Expr, OnConflict};

    let result: Result<invitation::Model> = async {
        let txn = db.begin().await?;

        let invitation = Invitation::find_by_id(invitation_id)
            .one(&txn)
            .await?
            .ok_or(Error::InvitationNotFound { invitation_id })?;

        if invitation.to_user_id != acting_user_id {
            return Err(Error::Unauthorized {
                reason: "only the recipient can accept this invitation".to_string(),
            });
        }
        if !accept {
            return Err(Error::InvalidAcceptValue);
        }
        if invitation.is_accepted {
            return Err(Error::AlreadyResolved { invitation_id });
        }

        // Guarded flip: a concurrent accept that got here first leaves nothing to update.
        let updated = Invitation::update_many()
            .col_expr(invitation::Column::IsAccepted, Expr::value(true))
            .filter(invitation::Column::Id.eq(invitation_id))
            .filter(invitation::Column::IsAccepted.eq(false))
            .exec(&txn)
            .await?;
        if updated.rows_affected != 1 {
            return Err(Error::AlreadyResolved { invitation_id });
        }

        let now = chrono::Utc::now();
        let edge = |user_id: i64, friend_id: i64| friendship::ActiveModel {
            user_id: Set(user_id),
            friend_id: Set(friend_id),
            created_at: Set(now),
        };
        Friendship::insert_many([
            edge(invitation.from_user_id, invitation.to_user_id),
            edge(invitation.to_user_id, invitation.from_user_id),
        ])
        .on_conflict(
            OnConflict::columns([friendship::Column::UserId, friendship::Column::FriendId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;

        Ok(invitation::Model {
            is_accepted: true,
            ..invitation
        })
    }
    .await;

    let invitation = result.inspect_err(trace_failure)?;
    info!(
        from_user_id = invitation.from_user_id,
        to_user_id = invitation.to_user_id,
        "Invitation accepted"
    );
    Ok(invitation)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[tokio::test]
    async fn test_send_invitation_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let invitation = send_invitation(&db, alice.id, &bob.email).await?;
        assert_eq!(invitation.from_user_id, alice.id);
        assert_eq!(invitation.to_user_id, bob.id);
        assert!(!invitation.is_accepted);

        // Pending invitations do not make anyone a friend.
        assert!(!is_friend(&db, alice.id, bob.id).await?);
        assert!(!is_friend(&db, bob.id, alice.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_unknown_email() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;

        let result = send_invitation(&db, alice.id, "nobody@example.com").await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_unknown_sender() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = send_invitation(&db, 999, "bob@example.com").await;
        assert!(matches!(result, Err(Error::UserNotFound { identifier }) if identifier == "999"));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_to_self() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;

        let result = send_invitation(&db, alice.id, &alice.email).await;
        assert!(matches!(result, Err(Error::SelfInvitation)));
        assert_eq!(Invitation::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_twice_keeps_one_pending_row() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        send_invitation(&db, alice.id, &bob.email).await?;
        let result = send_invitation(&db, alice.id, &bob.email).await;
        assert!(matches!(result, Err(Error::DuplicateInvitation { .. })));
        assert_eq!(Invitation::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_reverse_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        send_invitation(&db, alice.id, &bob.email).await?;
        let result = send_invitation(&db, bob.id, &alice.email).await;
        assert!(matches!(
            result,
            Err(Error::DuplicateInvitation { from_user_id, to_user_id })
                if from_user_id == alice.id && to_user_id == bob.id
        ));
        assert_eq!(Invitation::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_invitation_already_friends() -> Result<()> {
        let (db, alice, bob) = setup_with_friends().await?;

        let result = send_invitation(&db, alice.id, &bob.email).await;
        assert!(matches!(result, Err(Error::AlreadyFriends { .. })));
        let result = send_invitation(&db, bob.id, &alice.email).await;
        assert!(matches!(result, Err(Error::AlreadyFriends { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_makes_friendship_symmetric() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let invitation = send_invitation(&db, alice.id, &bob.email).await?;
        let accepted = accept_invitation(&db, invitation.id, bob.id, true).await?;
        assert!(accepted.is_accepted);
        assert_eq!(accepted.id, invitation.id);

        assert!(is_friend(&db, alice.id, bob.id).await?);
        assert!(is_friend(&db, bob.id, alice.id).await?);
        assert_eq!(Friendship::find().count(&db).await?, 2);

        let stored = Invitation::find_by_id(invitation.id).one(&db).await?.unwrap();
        assert!(stored.is_accepted);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_twice_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let invitation = send_invitation(&db, alice.id, &bob.email).await?;
        accept_invitation(&db, invitation.id, bob.id, true).await?;

        let result = accept_invitation(&db, invitation.id, bob.id, true).await;
        assert!(matches!(
            result,
            Err(Error::AlreadyResolved { invitation_id }) if invitation_id == invitation.id
        ));
        assert_eq!(Friendship::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_by_sender_is_unauthorized() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let carol = create_test_user(&db, "carol").await?;

        let invitation = send_invitation(&db, alice.id, &bob.email).await?;

        for intruder in [alice.id, carol.id] {
            let result = accept_invitation(&db, invitation.id, intruder, true).await;
            assert!(matches!(result, Err(Error::Unauthorized { .. })));
        }
        assert_eq!(Friendship::find().count(&db).await?, 0);
        let stored = Invitation::find_by_id(invitation.id).one(&db).await?.unwrap();
        assert!(!stored.is_accepted);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_with_false_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let invitation = send_invitation(&db, alice.id, &bob.email).await?;
        let result = accept_invitation(&db, invitation.id, bob.id, false).await;
        assert!(matches!(result, Err(Error::InvalidAcceptValue)));

        // Still pending, so it can be accepted afterwards.
        accept_invitation(&db, invitation.id, bob.id, true).await?;
        assert!(is_friend(&db, alice.id, bob.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_between_friends_keeps_edges() -> Result<()> {
        let (db, alice, bob) = setup_with_friends().await?;

        // A reverse invitation left over from before the friendship was formed.
        let leftover = invitation::ActiveModel {
            from_user_id: Set(bob.id),
            to_user_id: Set(alice.id),
            is_accepted: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let accepted = accept_invitation(&db, leftover.id, alice.id, true).await?;
        assert!(accepted.is_accepted);
        assert_eq!(Friendship::find().count(&db).await?, 2);
        let pending = Invitation::find()
            .filter(invitation::Column::IsAccepted.eq(false))
            .count(&db)
            .await?;
        assert_eq!(pending, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_rolls_back_when_edge_insert_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let invitation = send_invitation(&db, alice.id, &bob.email).await?;

        db.execute_unprepared(
            "CREATE TRIGGER reject_friend_edges BEFORE INSERT ON friendships \
             BEGIN SELECT RAISE(ABORT, 'edge rejected'); END",
        )
        .await?;

        let result = accept_invitation(&db, invitation.id, bob.id, true).await;
        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(Friendship::find().count(&db).await?, 0);
        let stored = Invitation::find_by_id(invitation.id).one(&db).await?.unwrap();
        assert!(!stored.is_accepted);

        // Nothing was committed, so the invitation can still be accepted.
        db.execute_unprepared("DROP TRIGGER reject_friend_edges").await?;
        accept_invitation(&db, invitation.id, bob.id, true).await?;
        assert!(is_friend(&db, alice.id, bob.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_invitation_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let bob = create_test_user(&db, "bob").await?;

        let result = accept_invitation(&db, 404, bob.id, true).await;
        assert!(matches!(
            result,
            Err(Error::InvitationNotFound { invitation_id: 404 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_friends() -> Result<()> {
        let (db, alice, bob) = setup_with_friends().await?;
        let carol = create_test_user(&db, "carol").await?;
        make_friends(&db, &alice, &carol).await?;

        let friends = list_friends(&db, alice.id).await?;
        assert_eq!(friends, vec![bob.clone(), carol.clone()]);

        let friends = list_friends(&db, bob.id).await?;
        assert_eq!(friends, vec![alice.clone()]);

        assert!(list_friends(&db, carol.id).await?.contains(&alice));
        assert!(matches!(
            list_friends(&db, 999).await,
            Err(Error::UserNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_invitations_sent_and_received() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let carol = create_test_user(&db, "carol").await?;

        let to_bob = send_invitation(&db, alice.id, &bob.email).await?;
        let from_carol = send_invitation(&db, carol.id, &alice.email).await?;

        let invitations = list_invitations(&db, alice.id).await?;
        assert_eq!(invitations.len(), 2);
        assert!(invitations.contains(&to_bob));
        assert!(invitations.contains(&from_carol));

        let invitations = list_invitations(&db, bob.id).await?;
        assert_eq!(invitations, vec![to_bob]);
        Ok(())
    }
}
