use std::sync::Arc;

use crate::{
    ActionKind, ClaimConfig, ClaimantGroup, ClaimantPlayer, Claimant, ClaimedRegion, GroupId,
    Location, Owner, PermissionOverride, PlayerId, RegionCoord, Relationship,
};

/// Read access to everything the [`PermissionResolver`] consults. The
/// registry implements this over its in-memory ledger, so resolving never
/// touches storage.
pub trait ClaimView {
    /// The engine configuration
    fn config(&self) -> &ClaimConfig;

    /// The tracked region at `coord`, if any
    fn region(&self, coord: &RegionCoord) -> Option<&Arc<ClaimedRegion>>;

    /// The player record for `id`, if any
    fn player(&self, id: &PlayerId) -> Option<&ClaimantPlayer>;

    /// The group record for `id`, if any
    fn group(&self, id: &GroupId) -> Option<&ClaimantGroup>;

    /// The record of whichever claimant `owner` refers to
    fn claimant(&self, owner: &Owner) -> Option<Claimant<'_>> {
        match owner {
            Owner::Player(id) => self.player(id).map(Claimant::Player),
            Owner::Group(id) => self.group(id).map(Claimant::Group),
        }
    }
}

/// Decides whether an actor may perform an action at a location.
///
/// The decision walks from the region at the location to the owner of the
/// block's height, then to the actor's relationship with that owner, the
/// owner's explicit overrides, the default policy and finally the region's
/// settings. It is total: every well-formed query yields an answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionResolver;

impl PermissionResolver {
    /// Whether `actor` may perform `action` at `location`. An actor of `None`
    /// stands for the environment (fire, explosions, creatures) and is
    /// treated as a stranger everywhere.
    pub fn can_actor_do<View>(
        view: &View,
        actor: Option<PlayerId>,
        location: &Location,
        action: ActionKind,
    ) -> bool
    where
        View: ClaimView + ?Sized,
    {
        let wilderness = || {
            action
                .gated_by()
                .is_none_or(|setting| {
                    view.config()
                        .wilderness_settings
                        .contains(setting.flag())
                })
        };

        let Some(region) = view.region(&location.region()) else {
            return wilderness();
        };
        let Some(owner) = region.owner_at(location.y) else {
            return wilderness();
        };

        let relationship = Self::relationship(view, actor, &owner);
        if relationship == Relationship::Owner {
            return true;
        }

        let decision = match view
            .claimant(&owner)
            .map(|claimant| claimant.permission_override(action))
            .unwrap_or_default()
        {
            PermissionOverride::Deny => false,
            PermissionOverride::Allow => true,
            PermissionOverride::Inherit => default_policy(relationship, action),
        };

        decision
            && action
                .gated_by()
                .is_none_or(|setting| region.is_setting(setting))
    }

    /// How `actor` relates to `owner`.
    ///
    /// Friendship is read from the owner's side only: an actor is a friend
    /// when the owning player has acknowledged them.
    pub fn relationship<View>(view: &View, actor: Option<PlayerId>, owner: &Owner) -> Relationship
    where
        View: ClaimView + ?Sized,
    {
        let Some(actor) = actor else {
            return Relationship::Stranger;
        };
        match owner {
            Owner::Player(id) if *id == actor => Relationship::Owner,
            Owner::Player(id) => match view.player(id) {
                Some(player) if player.is_friend(&actor) => Relationship::Friend,
                _ => Relationship::Stranger,
            },
            Owner::Group(id) => match view.group(id) {
                Some(group) if *group.owner() == actor => Relationship::Owner,
                Some(group) => group
                    .rank(&actor)
                    .map(Relationship::Member)
                    .unwrap_or(Relationship::Stranger),
                None => Relationship::Stranger,
            },
        }
    }
}

/// The decision for `action` when the owner has not overridden it
pub fn default_policy(relationship: Relationship, action: ActionKind) -> bool {
    match relationship {
        Relationship::Owner | Relationship::Friend => true,
        Relationship::Member(rank) if rank >= action.required_rank() => true,
        Relationship::Member(_) | Relationship::Stranger => action.is_passive(),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use crate::{
        ActionKind, ClaimConfig, ClaimView, ClaimantGroup, ClaimantPlayer, ClaimedRegion, GroupId,
        Location, Owner, PermissionOverride, PermissionResolver, PlayerId, Rank, RegionCoord,
        RegionSetting, RegionSettings, Relationship,
    };

    #[derive(Default)]
    struct Fixture {
        config: ClaimConfig,
        regions: HashMap<RegionCoord, Arc<ClaimedRegion>>,
        players: HashMap<PlayerId, ClaimantPlayer>,
        groups: HashMap<GroupId, ClaimantGroup>,
    }

    impl ClaimView for Fixture {
        fn config(&self) -> &ClaimConfig {
            &self.config
        }

        fn region(&self, coord: &RegionCoord) -> Option<&Arc<ClaimedRegion>> {
            self.regions.get(coord)
        }

        fn player(&self, id: &PlayerId) -> Option<&ClaimantPlayer> {
            self.players.get(id)
        }

        fn group(&self, id: &GroupId) -> Option<&ClaimantGroup> {
            self.groups.get(id)
        }
    }

    impl Fixture {
        fn claim(&mut self, location: &Location, owner: Owner) -> &mut ClaimedRegion {
            let mut region = ClaimedRegion::new(
                location.region(),
                self.config.bounds,
                self.config.default_region_settings,
            );
            region.set_owner(Some(owner));
            let region = self
                .regions
                .entry(location.region())
                .or_insert(Arc::new(region));
            Arc::make_mut(region)
        }

        fn player_mut(&mut self, id: PlayerId) -> &mut ClaimantPlayer {
            self.players
                .entry(id)
                .or_insert_with(|| ClaimantPlayer::new(id))
        }
    }

    fn here() -> Location {
        Location::new("overworld", 8, 64, 8)
    }

    #[test]
    fn it_allows_anything_in_the_wilderness_by_default() {
        let view = Fixture::default();

        for action in ActionKind::ALL {
            assert!(PermissionResolver::can_actor_do(
                &view,
                Some(PlayerId::new()),
                &here(),
                action
            ));
        }
    }

    #[test]
    fn it_honours_wilderness_settings() {
        let view = Fixture {
            config: ClaimConfig {
                wilderness_settings: RegionSettings::all().difference(RegionSettings::EXPLOSIONS),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(!PermissionResolver::can_actor_do(&view, None, &here(), ActionKind::Explode));
        assert!(PermissionResolver::can_actor_do(&view, None, &here(), ActionKind::Burn));
    }

    #[test]
    fn it_lets_owners_do_anything_despite_their_own_overrides() {
        let mut view = Fixture::default();
        let alice = PlayerId::new();
        view.claim(&here(), alice.into());
        view.player_mut(alice)
            .set_permission_override(ActionKind::Blocks, PermissionOverride::Deny);

        for action in ActionKind::ALL {
            assert!(PermissionResolver::can_actor_do(&view, Some(alice), &here(), action));
        }
    }

    #[test]
    fn it_only_trusts_friends_the_owner_acknowledged() {
        let mut view = Fixture::default();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        view.claim(&here(), alice.into());
        view.player_mut(bob).add_friend(alice);

        assert!(!PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Blocks));
        assert!(PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Doors));

        view.player_mut(alice).add_friend(bob);

        assert!(PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Blocks));
    }

    #[test]
    fn it_applies_overrides_to_everyone_but_the_owner() {
        let mut view = Fixture::default();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        view.claim(&here(), alice.into());
        view.player_mut(alice).add_friend(bob);
        view.player_mut(alice)
            .set_permission_override(ActionKind::Storage, PermissionOverride::Deny);
        view.player_mut(alice)
            .set_permission_override(ActionKind::Harvest, PermissionOverride::Allow);

        assert!(!PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Storage));
        assert!(PermissionResolver::can_actor_do(&view, None, &here(), ActionKind::Harvest));
    }

    #[test]
    fn it_compares_member_ranks_with_the_required_rank() {
        let mut view = Fixture::default();
        let founder = PlayerId::new();
        let recruit = PlayerId::new();
        let officer = PlayerId::new();
        let mut group = ClaimantGroup::new(GroupId::new(), founder);
        group.add_member(recruit, Rank::Recruit).unwrap();
        group.add_member(officer, Rank::Officer).unwrap();
        view.claim(&here(), (*group.id()).into());
        let owner = Owner::from(*group.id());
        view.groups.insert(*group.id(), group);

        assert_eq!(
            PermissionResolver::relationship(&view, Some(founder), &owner),
            Relationship::Owner
        );
        assert_eq!(
            PermissionResolver::relationship(&view, Some(recruit), &owner),
            Relationship::Member(Rank::Recruit)
        );

        assert!(PermissionResolver::can_actor_do(&view, Some(recruit), &here(), ActionKind::Pickup));
        assert!(!PermissionResolver::can_actor_do(&view, Some(recruit), &here(), ActionKind::Blocks));
        assert!(PermissionResolver::can_actor_do(&view, Some(officer), &here(), ActionKind::Blocks));
    }

    #[test]
    fn it_lets_region_settings_veto_allowed_actions() {
        let mut view = Fixture::default();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        view.claim(&here(), alice.into());
        view.player_mut(alice)
            .set_permission_override(ActionKind::Combat, PermissionOverride::Allow);

        assert!(!PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Combat));

        view.claim(&here(), alice.into())
            .set_setting(RegionSetting::PlayerCombat, true);

        assert!(PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Combat));
    }

    #[test]
    fn it_resolves_subdivided_slices_to_their_own_owner() {
        let mut view = Fixture::default();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        view.claim(&here(), alice.into())
            .set_slice_owner(2, -20, -16, Some(bob.into()), true)
            .unwrap();
        let cave = Location::new("overworld", 8, -18, 8);

        assert!(PermissionResolver::can_actor_do(&view, Some(bob), &cave, ActionKind::Blocks));
        assert!(!PermissionResolver::can_actor_do(&view, Some(alice), &cave, ActionKind::Blocks));
        assert!(!PermissionResolver::can_actor_do(&view, Some(bob), &here(), ActionKind::Blocks));
    }
}
