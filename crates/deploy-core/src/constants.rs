//! Constantes del secuenciador.
//!
//! `SEQUENCER_VERSION` forma parte del input de los fingerprints de unidad y
//! de run: cambiarla invalida los fingerprints previos aunque el plan y los
//! artifacts no cambien.

/// Versión lógica del secuenciador. Mantener estable mientras no haya cambios
/// incompatibles en el formato de eventos o en el cálculo de fingerprints.
pub const SEQUENCER_VERSION: &str = "D1.0";

/// Red usada cuando ni la configuración ni el backend indican otra.
pub const DEFAULT_NETWORK: &str = "development";
