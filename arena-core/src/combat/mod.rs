//! The combat session: layout, initiative and the turn loop.
//!
//! A [`CombatSession`] owns everything a match touches, including its RNG
//! and configuration, and is driven one actor turn at a time by
//! [`CombatSession::advance`].
//!
//! # Example
//!
//! ```ignore
//! use arena_core::{CombatConfig, CombatSession, Team};
//! use arena_core::fighter::Side;
//!
//! let teams = [Team::new("Red", Side::Home), Team::new("Blue", Side::Away)];
//! let mut session = CombatSession::new(teams, roster, CombatConfig::new(12, 8).with_seed(7u64))?;
//! while !session.is_finished() {
//!     for event in session.advance() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod attack;
pub mod spell;

use crate::classes::CharacterClass;
use crate::conditions::Condition;
use crate::config::{CombatConfig, TurnEconomy};
use crate::dice::{Advantage, DiceRng};
use crate::error::CombatError;
use crate::events::{AttackHand, CombatEvent, EndReason, EventLog, WaitReason, Winner};
use crate::fighter::{Ability, Fighter, FighterId, Side};
use crate::grid::{distance, next_step, Grid, Occupancy, Position, Step};
use crate::targeting::select_target;
use crate::xp::{challenge_value, grant_xp, scaled_share, split_award};
use attack::{weapon_for, TurnState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a combat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatId(pub Uuid);

impl CombatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    NotStarted,
    InProgress,
    Finished,
}

/// One side's banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// RGB display color.
    pub color: (u8, u8, u8),
    pub side: Side,
    /// Filled in from the roster when the session is created.
    pub members: Vec<FighterId>,
}

impl Team {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        let color = match side {
            Side::Home => (200, 60, 60),
            Side::Away => (60, 90, 200),
        };
        Self {
            name: name.into(),
            color,
            side,
            members: Vec::new(),
        }
    }

    pub fn with_color(mut self, r: u8, g: u8, b: u8) -> Self {
        self.color = (r, g, b);
        self
    }
}

/// Per-fighter summary of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterResult {
    pub id: FighterId,
    pub name: String,
    pub side: Side,
    pub alive: bool,
    pub hp: i32,
    pub max_hp: i32,
    pub level: u8,
    pub levels_gained: u8,
    pub xp: u32,
    pub xp_gained: u32,
    pub kills: u32,
    pub damage_dealt: i32,
}

#[derive(Debug, Clone, Default)]
struct Tally {
    kills: u32,
    damage_dealt: i32,
    xp_gained: u32,
    start_level: u8,
}

/// A running match between two teams.
#[derive(Debug)]
pub struct CombatSession {
    id: CombatId,
    teams: [Team; 2],
    fighters: Vec<Fighter>,
    grid: Grid,
    occupancy: Occupancy,
    /// Roster indices in initiative order.
    order: Vec<usize>,
    cursor: usize,
    round: u32,
    rng: DiceRng,
    log: EventLog,
    winner: Option<Winner>,
    phase: CombatPhase,
    config: CombatConfig,
    /// Defender index -> everyone on the other side who damaged it.
    contributors: BTreeMap<usize, BTreeSet<usize>>,
    tally: Vec<Tally>,
}

impl CombatSession {
    /// Validate the roster, lay out the board, roll initiative and open
    /// round 1.
    pub fn new(
        mut teams: [Team; 2],
        fighters: Vec<Fighter>,
        config: CombatConfig,
    ) -> Result<Self, CombatError> {
        if fighters.len() < 2 {
            return Err(CombatError::NotEnoughFighters {
                count: fighters.len(),
            });
        }
        for side in Side::both() {
            if !fighters.iter().any(|f| f.side == side) {
                return Err(CombatError::MissingSide(side));
            }
        }
        let mut seen = BTreeSet::new();
        for f in &fighters {
            if !seen.insert(f.id) {
                return Err(CombatError::DuplicateFighter(f.id));
            }
        }
        let grid = config.grid;
        if grid.width < 2 || grid.height < 1 || grid.tiles() < fighters.len() as u64 {
            return Err(CombatError::GridTooSmall {
                width: grid.width,
                height: grid.height,
                fighters: fighters.len(),
            });
        }

        for (team, side) in teams.iter_mut().zip(Side::both()) {
            team.side = side;
            team.members = fighters
                .iter()
                .filter(|f| f.side == side)
                .map(|f| f.id)
                .collect();
        }

        let tally = fighters
            .iter()
            .map(|f| Tally {
                start_level: f.level(),
                ..Tally::default()
            })
            .collect();
        let mut session = Self {
            id: CombatId::new(),
            teams,
            fighters,
            grid,
            occupancy: Occupancy::new(),
            order: Vec::new(),
            cursor: 0,
            round: 0,
            rng: DiceRng::new(&config.seed),
            log: EventLog::new(),
            winner: None,
            phase: CombatPhase::NotStarted,
            config,
            contributors: BTreeMap::new(),
            tally,
        };
        session.start();
        Ok(session)
    }

    fn start(&mut self) {
        let span = tracing::info_span!("combat", id = %self.id);
        let _enter = span.enter();

        for f in &mut self.fighters {
            f.reaction_ready = true;
        }
        for (index, from, to) in initial_layout(&self.grid, &mut self.fighters) {
            self.log.push(CombatEvent::SpawnAdjusted {
                fighter: self.fighters[index].name.clone(),
                from,
                to,
            });
        }
        self.occupancy = Occupancy::from_fighters(
            self.fighters
                .iter()
                .enumerate()
                .map(|(i, f)| (i, f.position, f.is_alive())),
        );

        self.roll_initiative();
        self.phase = CombatPhase::InProgress;
        self.round = 1;
        tracing::info!(
            fighters = self.fighters.len(),
            width = self.grid.width,
            height = self.grid.height,
            "combat started"
        );
        self.log.push(CombatEvent::RoundStart {
            round: 1,
            order: self.living_order(),
        });
        self.check_end();
    }

    fn roll_initiative(&mut self) {
        if let Some(script) = self.config.initiative_order.clone() {
            let mut order: Vec<usize> = Vec::with_capacity(self.fighters.len());
            for id in script {
                if let Some(index) = self.fighters.iter().position(|f| f.id == id) {
                    if !order.contains(&index) {
                        order.push(index);
                    }
                }
            }
            for index in 0..self.fighters.len() {
                if !order.contains(&index) {
                    order.push(index);
                }
            }
            let count = order.len();
            for (rank, &index) in order.iter().enumerate() {
                let f = &self.fighters[index];
                self.log.push(CombatEvent::Init {
                    fighter: f.name.clone(),
                    side: f.side,
                    roll: 0,
                    total: (count - rank) as i32,
                });
            }
            self.order = order;
            return;
        }

        let mut totals = Vec::with_capacity(self.fighters.len());
        for index in 0..self.fighters.len() {
            let f = &self.fighters[index];
            let advantage = if f.traits.initiative_advantage {
                Advantage::Advantage
            } else {
                Advantage::Normal
            };
            let bonus = f.modifier(Ability::Dexterity) + f.traits.initiative_bonus;
            let roll = self.rng.d20(advantage);
            let total = roll.natural as i32 + bonus;
            let f = &self.fighters[index];
            self.log.push(CombatEvent::Init {
                fighter: f.name.clone(),
                side: f.side,
                roll: roll.natural,
                total,
            });
            totals.push((index, total));
        }
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        self.order = totals.into_iter().map(|(index, _)| index).collect();
    }

    /// Run one actor's turn and return the events it produced.
    ///
    /// Returns an empty slice once the combat is finished.
    pub fn advance(&mut self) -> &[CombatEvent] {
        if self.phase != CombatPhase::InProgress {
            return &[];
        }
        let start = self.log.len();
        let span = tracing::debug_span!("advance", combat = %self.id, round = self.round);
        let _enter = span.enter();

        if let Some(actor) = self.next_actor() {
            self.take_turn(actor);
            self.check_end();
        }
        if self.phase == CombatPhase::InProgress {
            self.skip_dead();
            if self.cursor >= self.order.len() {
                self.next_round();
            }
        }
        self.log.since(start)
    }

    fn skip_dead(&mut self) {
        while self
            .order
            .get(self.cursor)
            .is_some_and(|&i| !self.fighters[i].is_alive())
        {
            self.cursor += 1;
        }
    }

    fn next_actor(&mut self) -> Option<usize> {
        self.skip_dead();
        if self.cursor >= self.order.len() {
            self.next_round();
            self.skip_dead();
        }
        let actor = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(actor)
    }

    fn next_round(&mut self) {
        self.log.push(CombatEvent::RoundEnd { round: self.round });
        self.round += 1;
        self.cursor = 0;
        for f in &mut self.fighters {
            f.reaction_ready = true;
        }
        self.log.push(CombatEvent::RoundStart {
            round: self.round,
            order: self.living_order(),
        });
    }

    fn living_order(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|&i| &self.fighters[i])
            .filter(|f| f.is_alive())
            .map(|f| f.name.clone())
            .collect()
    }

    fn take_turn(&mut self, actor: usize) {
        let name = self.fighters[actor].name.clone();
        self.log.push(CombatEvent::TurnStart {
            actor: name.clone(),
            round: self.round,
        });
        tracing::debug!(actor = %name, round = self.round, "turn start");

        let incapacitated = self.fighters[actor].conditions.incapacitating();
        for condition in self.fighters[actor].conditions.decrement_all() {
            self.log.push(CombatEvent::ConditionEnded {
                target: name.clone(),
                condition,
            });
        }
        if let Some(condition) = incapacitated {
            self.log.push(CombatEvent::TurnSkipped {
                actor: name,
                condition,
            });
            return;
        }

        let a = &self.fighters[actor];
        let charmer = if a.has_condition(Condition::Charmed) {
            a.conditions.source(Condition::Charmed)
        } else {
            None
        };
        let Some(target) = self.choose_target(actor, charmer) else {
            let reason = if charmer.is_some() && self.has_living_enemy(actor) {
                WaitReason::Charmed
            } else {
                WaitReason::NoTarget
            };
            self.log.push(CombatEvent::Wait {
                actor: name,
                reason,
            });
            return;
        };

        let mut turn = TurnState {
            sneak_used: false,
            exclude: charmer,
        };
        self.act(actor, target, &mut turn);
        self.end_of_turn(actor);
    }

    fn choose_target(&self, actor: usize, exclude: Option<FighterId>) -> Option<usize> {
        let a = &self.fighters[actor];
        let tactics = &self.config.tactics;
        let policy = tactics.policy_for(a.id, a.side, a.tactics.as_ref());
        select_target(a, &policy, &self.fighters, tactics.biases_for(a.side), exclude)
    }

    fn has_living_enemy(&self, actor: usize) -> bool {
        let side = self.fighters[actor].side;
        self.fighters.iter().any(|f| f.is_alive() && f.side != side)
    }

    /// Distance the actor tries to close to: weapon reach, or spell range
    /// while the spell has uses.
    fn engage_range(&self, actor: usize) -> u32 {
        let a = &self.fighters[actor];
        let weapon = a.equipment.main_hand.preferred_reach();
        match &a.spell {
            Some(spell) if spell.is_ready() => weapon.max(spell.range()),
            _ => weapon,
        }
    }

    fn gap(&self, a: usize, b: usize) -> u32 {
        distance(self.fighters[a].position, self.fighters[b].position)
    }

    fn in_weapon_reach(&self, actor: usize, target: usize) -> bool {
        self.gap(actor, target) <= self.fighters[actor].equipment.main_hand.max_reach()
    }

    fn act(&mut self, actor: usize, target: usize, turn: &mut TurnState) {
        if self.can_cast_at(actor, target) {
            self.cast_spell(actor, target);
            return;
        }

        if self.gap(actor, target) > self.engage_range(actor) && self.fighters[actor].movement() > 0
        {
            let moved = self.move_toward(actor, target);
            if !self.fighters[actor].is_alive() {
                return;
            }
            if moved > 0 && self.config.turn_economy == TurnEconomy::MoveOrAttack {
                return;
            }
            if self.can_cast_at(actor, target) {
                self.cast_spell(actor, target);
            } else if self.in_weapon_reach(actor, target) {
                self.attack_sequence(actor, target, turn);
            } else if moved == 0 {
                self.wait_out_of_reach(actor);
            }
            return;
        }

        if self.in_weapon_reach(actor, target) {
            self.attack_sequence(actor, target, turn);
        } else {
            self.wait_out_of_reach(actor);
        }
    }

    fn wait_out_of_reach(&mut self, actor: usize) {
        self.log.push(CombatEvent::Wait {
            actor: self.fighters[actor].name.clone(),
            reason: WaitReason::OutOfReach,
        });
    }

    /// Greedy steps toward `target` until in engage range or out of
    /// movement. Returns the number of tiles moved.
    fn move_toward(&mut self, mover: usize, target: usize) -> u32 {
        let steps = self.fighters[mover].movement();
        let reach = self.engage_range(mover);
        let goal = self.fighters[target].position;
        let grid = self.grid;
        let mut moved = 0;

        while moved < steps {
            let from = self.fighters[mover].position;
            if distance(from, goal) <= reach {
                break;
            }
            let occupancy = &self.occupancy;
            match next_step(from, goal, |p| occupancy.is_free(&grid, p)) {
                Step::Arrived => break,
                Step::Blocked { tile } => {
                    let by = self
                        .occupancy
                        .occupant(tile)
                        .map(|i| self.fighters[i].name.clone())
                        .unwrap_or_default();
                    self.log.push(CombatEvent::Blocked {
                        actor: self.fighters[mover].name.clone(),
                        to: tile,
                        by,
                    });
                    break;
                }
                Step::Moved(to) => {
                    self.provoke_opportunity_attacks(mover, from, to);
                    if !self.fighters[mover].is_alive() {
                        break;
                    }
                    self.occupancy.relocate(from, to, mover);
                    self.fighters[mover].position = to;
                    self.log.push(CombatEvent::Move {
                        actor: self.fighters[mover].name.clone(),
                        from,
                        to,
                    });
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Melee enemies whose reach `mover` is leaving swing at it, in roster
    /// order, each spending its reaction.
    fn provoke_opportunity_attacks(&mut self, mover: usize, from: Position, to: Position) {
        let side = self.fighters[mover].side;
        let mover_id = self.fighters[mover].id;
        let reactors: Vec<usize> = self
            .fighters
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                let weapon = &f.equipment.main_hand;
                let reach = weapon.max_reach();
                f.is_alive()
                    && f.side != side
                    && f.reaction_ready
                    && !f.is_incapacitated()
                    && !weapon.is_ranged()
                    && distance(f.position, from) <= reach
                    && distance(f.position, to) > reach
                    && !(f.has_condition(Condition::Charmed)
                        && f.conditions.source(Condition::Charmed) == Some(mover_id))
            })
            .map(|(i, _)| i)
            .collect();

        for reactor in reactors {
            if !self.fighters[mover].is_alive() {
                break;
            }
            self.fighters[reactor].reaction_ready = false;
            let mut turn = TurnState::default();
            self.resolve_attack(reactor, mover, AttackHand::Opportunity, &mut turn);
        }
    }

    /// Main-hand attacks (plus extra attacks), then the off hand, then a
    /// martial-arts bonus strike.
    fn attack_sequence(&mut self, actor: usize, target: usize, turn: &mut TurnState) {
        let swings = 1 + self.fighters[actor].traits.extra_attacks as usize;
        let mut current = Some(target);
        for _ in 0..swings {
            let Some(t) = self.target_in_reach(actor, current, AttackHand::Main, turn) else {
                return;
            };
            self.resolve_attack(actor, t, AttackHand::Main, turn);
            current = Some(t);
        }

        if self.fighters[actor].equipment.off_hand.is_some() {
            if let Some(t) = self.target_in_reach(actor, current, AttackHand::OffHand, turn) {
                self.resolve_attack(actor, t, AttackHand::OffHand, turn);
                current = Some(t);
            }
        }

        let a = &self.fighters[actor];
        let martial_arts = a.class == Some(CharacterClass::Monk)
            && a.equipment.main_hand.unarmed
            && a.traits.unarmed_die.is_some();
        if martial_arts {
            if let Some(t) = self.target_in_reach(actor, current, AttackHand::Bonus, turn) {
                self.resolve_attack(actor, t, AttackHand::Bonus, turn);
            }
        }
    }

    /// `preferred` if it is still a legal target in reach of `hand`, else
    /// the policy pick if in reach, else the nearest enemy in reach.
    fn target_in_reach(
        &self,
        actor: usize,
        preferred: Option<usize>,
        hand: AttackHand,
        turn: &TurnState,
    ) -> Option<usize> {
        let a = &self.fighters[actor];
        let reach = weapon_for(a, hand)?.max_reach();
        let legal = |i: usize| {
            let f = &self.fighters[i];
            f.is_alive()
                && f.side != a.side
                && Some(f.id) != turn.exclude
                && distance(a.position, f.position) <= reach
        };
        if let Some(t) = preferred.filter(|&t| legal(t)) {
            return Some(t);
        }
        if let Some(t) = self.choose_target(actor, turn.exclude).filter(|&t| legal(t)) {
            return Some(t);
        }
        (0..self.fighters.len())
            .filter(|&i| legal(i))
            .min_by_key(|&i| {
                let f = &self.fighters[i];
                (distance(a.position, f.position), f.id)
            })
    }

    fn end_of_turn(&mut self, actor: usize) {
        let a = &self.fighters[actor];
        if a.is_alive() && a.traits.cunning_action && !self.enemy_adjacent(actor) {
            self.fighters[actor].hidden = true;
        }
    }

    fn side_alive(&self, side: Side) -> bool {
        self.fighters.iter().any(|f| f.side == side && f.is_alive())
    }

    fn check_end(&mut self) {
        if self.phase != CombatPhase::InProgress {
            return;
        }
        let (winner, reason) = match (self.side_alive(Side::Home), self.side_alive(Side::Away)) {
            (true, true) => return,
            (false, false) => (Winner::Draw, EndReason::DoubleElimination),
            (true, false) => (Winner::Side(Side::Home), EndReason::Elimination),
            (false, true) => (Winner::Side(Side::Away), EndReason::Elimination),
        };
        self.winner = Some(winner);
        self.phase = CombatPhase::Finished;
        self.log.push(CombatEvent::End {
            winner,
            reason,
            round: self.round,
        });
        tracing::info!(combat = %self.id, ?winner, round = self.round, "combat finished");
    }

    /// Clear a downed fighter off the board and pay out its XP.
    fn on_down(&mut self, defender: usize, killer: usize) {
        let position = self.fighters[defender].position;
        if self.occupancy.occupant(position) == Some(defender) {
            self.occupancy.remove(position);
        }
        self.fighters[defender].hidden = false;

        let name = self.fighters[defender].name.clone();
        let side = self.fighters[defender].side;
        self.log.push(CombatEvent::Down {
            fighter: name.clone(),
            side,
            by: self.fighters[killer].name.clone(),
        });
        tracing::debug!(fighter = %name, by = %self.fighters[killer].name, "fighter down");
        if self.fighters[killer].side != side {
            self.tally[killer].kills += 1;
        }

        let Some(contributors) = self.contributors.remove(&defender) else {
            return;
        };
        let share = split_award(
            challenge_value(self.fighters[defender].rating),
            contributors.len(),
        );
        for index in contributors {
            let amount = scaled_share(share, &self.fighters[index]);
            let before = self.fighters[index].xp;
            let ups = grant_xp(&mut self.fighters[index], amount, self.config.max_level_ups);
            let gained = self.fighters[index].xp - before;
            self.tally[index].xp_gained += gained;

            let recipient = self.fighters[index].name.clone();
            self.log.push(CombatEvent::XpGained {
                fighter: recipient.clone(),
                amount: gained,
                from: name.clone(),
            });
            for up in ups {
                tracing::debug!(fighter = %recipient, level = up.level, "level up");
                self.log.push(CombatEvent::LevelUp {
                    fighter: recipient.clone(),
                    level: up.level,
                    max_hp: up.max_hp,
                    ac: up.ac,
                });
            }
        }
    }

    pub fn id(&self) -> CombatId {
        self.id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == CombatPhase::Finished
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn fighters(&self) -> &[Fighter] {
        &self.fighters
    }

    pub fn fighter(&self, id: FighterId) -> Option<&Fighter> {
        self.fighters.iter().find(|f| f.id == id)
    }

    pub fn teams(&self) -> &[Team; 2] {
        &self.teams
    }

    pub fn team(&self, side: Side) -> &Team {
        &self.teams[side.index()]
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Fighter ids in initiative order.
    pub fn initiative_order(&self) -> Vec<FighterId> {
        self.order.iter().map(|&i| self.fighters[i].id).collect()
    }

    /// Who stands on `position`, if anyone alive does.
    pub fn occupant(&self, position: Position) -> Option<&Fighter> {
        self.occupancy.occupant(position).map(|i| &self.fighters[i])
    }

    pub fn kills(&self, id: FighterId) -> u32 {
        self.fighters
            .iter()
            .position(|f| f.id == id)
            .map(|i| self.tally[i].kills)
            .unwrap_or(0)
    }

    pub fn results(&self) -> Vec<FighterResult> {
        self.fighters
            .iter()
            .zip(&self.tally)
            .map(|(f, t)| FighterResult {
                id: f.id,
                name: f.name.clone(),
                side: f.side,
                alive: f.is_alive(),
                hp: f.hp(),
                max_hp: f.max_hp(),
                level: f.level(),
                levels_gained: f.level().saturating_sub(t.start_level),
                xp: f.xp,
                xp_gained: t.xp_gained,
                kills: t.kills,
                damage_dealt: t.damage_dealt,
            })
            .collect()
    }

    /// Consume the session, handing back the fighters with their XP and
    /// levels for the caller to persist.
    pub fn into_fighters(self) -> Vec<Fighter> {
        self.fighters
    }
}

/// Place every living fighter on a distinct in-bounds tile.
///
/// Fighters without a requested spawn line up on their side's edge column,
/// rows spreading from the middle. Requested spawns are clamped onto the
/// board. Collisions are settled in roster order with
/// [`Grid::nearest_free`]; each fighter that had to move is returned as
/// `(index, wanted, given)`.
pub fn initial_layout(grid: &Grid, fighters: &mut [Fighter]) -> Vec<(usize, Position, Position)> {
    for side in Side::both() {
        let column = grid.spawn_column(side);
        let unplaced: Vec<usize> = fighters
            .iter()
            .enumerate()
            .filter(|(_, f)| f.side == side && f.spawn.is_none() && f.is_alive())
            .map(|(i, _)| i)
            .collect();
        let rows = grid.spread_rows(unplaced.len());
        for (index, row) in unplaced.into_iter().zip(rows) {
            fighters[index].position = Position::new(column, row);
        }
    }
    for f in fighters.iter_mut() {
        if let Some(spawn) = f.spawn {
            f.position = grid.clamp(spawn);
        }
    }

    let mut occupancy = Occupancy::new();
    let mut adjusted = Vec::new();
    for (index, f) in fighters.iter_mut().enumerate() {
        if !f.is_alive() {
            continue;
        }
        let wanted = f.position;
        match grid.nearest_free(wanted, &occupancy) {
            Some(given) => {
                if given != wanted {
                    adjusted.push((index, wanted, given));
                }
                f.position = given;
                occupancy.insert(given, index);
            }
            None => tracing::warn!(fighter = %f.name, "no free tile left, fighter keeps its spawn"),
        }
    }
    adjusted
}
