//! Scripted input for headless runs
//!
//! Fills the input snapshot with a simple policy: close on the nearest
//! living enemy, swing the basic weapon in reach, fire the equipped carrier
//! weapon at range, and spend gold on weighted shop offers between waves.
//! Deliberately dumb — it exists to exercise the full gameplay loop, not to
//! play well.

use bevy::prelude::*;

use crate::attack::{Arsenal, WeaponBook, WEAPON_ORBIT_RADIUS};
use crate::combat::components::{CombatStats, GameRng, Health, PlayerPerks};
use crate::combat::events::WaveCompleted;
use crate::combat::log::{RunLog, RunLogEventType};
use crate::content::GameContent;
use crate::economy::{self, EffectTarget, GoldLedger, ShopState};
use crate::enemy::Enemy;
use crate::movement::MoveController;
use crate::physics::Collider;
use crate::player::{InputSnapshot, Player};
use crate::pool::Dormant;

/// How many items each between-waves shop offer contains.
const OFFER_SIZE: usize = 3;

/// Refresh the input snapshot from the current world state.
pub fn drive_autopilot(
    mut input: ResMut<InputSnapshot>,
    book: Res<WeaponBook>,
    players: Query<(&Transform, &Arsenal, &Health), With<Player>>,
    enemies: Query<(&Transform, &Health, &Collider), (With<Enemy>, Without<Dormant>)>,
) {
    input.clear();

    let Ok((transform, arsenal, health)) = players.get_single() else {
        return;
    };
    if health.dead {
        return;
    }

    let position = transform.translation.truncate();

    let mut nearest: Option<(Vec2, f32)> = None;
    for (enemy_transform, enemy_health, collider) in enemies.iter() {
        if enemy_health.dead || !collider.enabled {
            continue;
        }
        let enemy_pos = enemy_transform.translation.truncate();
        let distance = position.distance(enemy_pos);
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((enemy_pos, distance));
        }
    }

    let Some((target, distance)) = nearest else {
        return;
    };

    let to_target = target - position;
    input.aim = to_target.normalize_or_zero();

    let basic = book.spec(arsenal.basic);
    let melee_reach = WEAPON_ORBIT_RADIUS + basic.range;

    if distance > melee_reach * 0.8 {
        input.move_dir = Vec2::new(to_target.x.signum(), 0.0);
    }

    if distance <= melee_reach {
        input.melee_pressed = true;
        return;
    }

    // Out of melee reach: use the equipped carrier weapon if it can fire,
    // otherwise scroll toward an unlocked special.
    let current = arsenal.current_weapon();
    if current != arsenal.basic {
        let spec = book.spec(current);
        let can_fire =
            !spec.use_ammo || arsenal.ammo_of(current) >= spec.ammo_cost_per_shot;
        if distance <= spec.range && can_fire {
            input.fire_held = true;
        }
    } else if arsenal.specials.iter().any(|id| book.is_unlocked(*id)) {
        input.weapon_scroll = -1.0;
    }
}

/// Spend gold during the intermission: roll one weighted offer per completed
/// wave and buy whatever it can afford, in offer order.
#[allow(clippy::too_many_arguments)]
pub fn auto_shop(
    mut completions: EventReader<WaveCompleted>,
    content: Res<GameContent>,
    mut shop_state: ResMut<ShopState>,
    mut ledger: ResMut<GoldLedger>,
    mut book: ResMut<WeaponBook>,
    mut rng: ResMut<GameRng>,
    mut log: ResMut<RunLog>,
    mut players: Query<
        (&mut CombatStats, &mut PlayerPerks, &mut Health, &mut MoveController, &mut Arsenal),
        With<Player>,
    >,
) {
    for _ in completions.read() {
        let Ok((mut stats, mut perks, mut health, mut mover, mut arsenal)) =
            players.get_single_mut()
        else {
            return;
        };

        let picks = economy::offer(&content.shop, &shop_state, &mut rng, OFFER_SIZE);
        for index in picks {
            let mut target = EffectTarget {
                stats: &mut stats,
                perks: &mut perks,
                health: &mut health,
                mover: &mut mover,
                arsenal: &mut arsenal,
                book: &mut book,
            };
            if economy::try_purchase(
                &content.shop,
                index,
                &mut shop_state,
                &mut ledger,
                &mut target,
            ) {
                log.log(
                    RunLogEventType::Economy,
                    format!(
                        "Bought '{}' ({} gold left)",
                        content.shop.items[index].title,
                        ledger.balance()
                    ),
                );
            }
        }
    }
}
