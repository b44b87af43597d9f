use crate::camera::CameraTarget;
use crate::character::CharacterId;

/// Operator commands, applied at the start of the tick they are scheduled for.
#[derive(Clone, Debug)]
pub enum CombatAction {
    BeginCombat,
    EnterPassive,
    ExitPassive,
    EndCombat,
    Damage { character: CharacterId, amount: f32 },
    DamageFrontEnemy { amount: f32 },
    MoveCamera { target: CameraTarget, seconds: f32, token: u32 },
}
