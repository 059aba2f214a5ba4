
pub mod planner;             // Calcul du montant de sortie et du min_amount_out.
pub mod instruction_builder; // Instruction SwapBaseIn + résolution des comptes de tokens.
pub mod retry;
pub mod executor;            // Achat, vente, et le trait appelé par le listener.
