// src/common/transition.rs

use std::fmt::Display;

use crate::common::error::AppError;

/// Tabela de transições de um status.
///
/// Cada ação conhece os status de origem permitidos e o status de destino.
/// Reservas, saques e reclamações implementam este trait e todo o código
/// (serviços e o `UPDATE` condicional dos repositórios) consulta a mesma tabela.
pub trait StatusAction: Copy {
    type Status: Copy + PartialEq + Display + 'static;

    fn name(&self) -> &'static str;
    fn allowed_from(&self) -> &'static [Self::Status];
    fn target(&self) -> Self::Status;

    fn is_allowed_from(&self, current: Self::Status) -> bool {
        self.allowed_from().contains(&current)
    }

    /// Valida a transição e devolve o novo status.
    fn apply(&self, current: Self::Status) -> Result<Self::Status, AppError> {
        if self.is_allowed_from(current) {
            Ok(self.target())
        } else {
            Err(AppError::InvalidTransition {
                from: current.to_string(),
                action: self.name().to_string(),
            })
        }
    }

    /// Os status de origem como texto, para `status::text = ANY($n)`.
    fn allowed_from_names(&self) -> Vec<String> {
        self.allowed_from().iter().map(|s| s.to_string()).collect()
    }
}
