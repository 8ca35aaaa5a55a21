//! Batch orchestration: concurrent per-term pipelines with failure isolation.
//!
//! One pipeline per product-type term — degradation-aware gateway search
//! followed by a generation job — all launched concurrently and joined
//! with [`futures::future::join_all`]. A pipeline failure becomes an
//! inline `{error: ...}` entry for that term only; it never aborts the
//! batch or touches sibling entries. The result is handed back only after
//! every pipeline has settled.

use crate::error::Result;
use crate::gateway::SearchGateway;
use crate::generation::{GenerationBackend, GenerationJobRunner};
use crate::proxy::SearchProxyClient;
use crate::token::TokenIssuer;
use crate::types::{CategorizedResult, TermEntry};
use tracing::{info, warn};

/// The built-in Brazilian product-type catalog the batch path was designed
/// around. Callers can pass any term list; this one mirrors the categories
/// the categorization assistant was tuned on.
pub const DEFAULT_PRODUCT_TYPES: &[&str] = &[
    // Eletrodomésticos
    "geladeira", "fogão", "micro-ondas", "lava-louças", "máquina de lavar roupa",
    "secadora de roupas", "aspirador de pó", "air fryer", "cafeteira", "torradeira",
    "liquidificador", "batedeira", "ferro de passar", "purificador de água",
    "ar-condicionado", "ventilador", "aquecedor", "panela elétrica", "grill elétrico",
    "forno elétrico", "sanduicheira", "fritadeira elétrica", "processador de alimentos",
    "coifa", "exaustor", "máquina de gelo", "adega climatizada", "máquina de costura",
    "lavadora de alta pressão", "cortador de grama", "triturador de alimentos",
    "fogão cooktop", "forno a gás", "bebedouro", "desumidificador", "umidificador",
    "aspirador robô", "chaleira elétrica", "espremedor de frutas", "sorveteira",
    "panela de arroz", "panela de pressão elétrica", "máquina de pão", "mopa a vapor",
    "purificador de ar", "cervejeira", "massageador", "máquina de crepe",
    "máquina de waffles", "forno elétrico de embutir",
    // Móveis
    "sofá", "cama", "mesa de jantar", "cadeira", "guarda-roupa", "escrivaninha",
    "estante", "rack para TV", "mesa de centro", "poltrona", "colchão", "criado-mudo",
    "aparador", "penteadeira", "banqueta", "beliche", "painel para TV", "cabeceira",
    "cômoda", "mesa de escritório", "estante de livros", "sapateira", "buffet",
    "cristaleira", "divã",
    // Moda e acessórios
    "camiseta", "calça jeans", "tênis", "bota", "bolsa", "relógio", "óculos de sol",
    "vestido", "saia", "camisa social", "jaqueta", "moletom", "blazer", "gravata",
    "brincos", "colar", "pulseira", "meia", "cueca", "sutiã", "boné", "chinelo",
    "cinto", "luvas", "cachecol",
    // Beleza e cuidados pessoais
    "perfume", "maquiagem", "shampoo", "condicionador", "creme hidratante",
    "protetor solar", "escova de dentes elétrica", "secador de cabelo", "chapinha",
    "barbeador elétrico", "aparador de pelos", "esfoliante", "sabonete líquido",
    "máscara facial", "kit manicure", "depilador elétrico", "lixa elétrica",
    "hidratante corporal", "kit de pincéis de maquiagem", "pinça", "creme anti-idade",
    "serum facial", "loção pós-barba", "tônico facial", "base para maquiagem",
    // Esporte e lazer
    "bicicleta", "esteira", "roupas de ginástica", "halteres", "tênis de corrida",
    "bola de futebol", "skate", "patins", "suplementos alimentares", "tapete de yoga",
    "bicicleta ergométrica", "elíptico", "luvas de boxe", "barras de flexão",
    "corda de pular", "banco de musculação", "faixas elásticas", "step",
    "bola de pilates", "kettlebell", "roupas de natação", "mochila de hidratação",
    "gorro de natação", "óculos de natação", "acessórios para bicicleta",
    // Eletrônicos e informática
    "smartphone", "notebook", "tablet", "smart TV", "headphone", "smartwatch",
    "câmera digital", "console de videogame", "caixa de som Bluetooth", "home theater",
    "projetor", "fone de ouvido sem fio", "monitor", "disco rígido externo",
    "impressora", "roteador", "mouse gamer", "teclado", "headset gamer",
    "placa de vídeo", "memória RAM", "SSD", "HD interno", "microfone",
    "leitor de e-book", "controle remoto universal", "antena digital", "estabilizador",
    "nobreak", "câmera de segurança", "drone", "power bank", "Chromecast", "Apple TV",
    "pen drive", "carregador de celular", "cabo HDMI", "suporte para TV",
    "adaptador USB", "carregador sem fio", "câmera instantânea",
    "fone com cancelamento de ruído", "placa-mãe", "processador",
    "kit de ferramentas eletrônicas", "leitor de cartão de memória",
    "lente para câmera", "flash para câmera",
    // Livros e mídia
    "livros", "DVDs", "blu-rays", "e-books", "CDs de música", "revistas",
    "áudiolivros", "quadrinhos", "mangás", "box de séries", "box de filmes",
    "enciclopédias", "mapas", "calendários", "agendas",
    // Brinquedos
    "boneca", "carrinho de controle remoto", "quebra-cabeça", "Lego",
    "jogos de tabuleiro", "videogames", "bonecos de ação", "pelúcia",
    "drones infantis", "massinha de modelar", "brinquedos educativos",
    "blocos de montar", "patinete", "triciclo", "piscina de bolinhas",
    "casa de bonecas", "carrinho de bebê de brinquedo",
    "instrumentos musicais infantis", "jogo de dardos", "pista de carrinhos",
    "castelo inflável", "bolas esportivas", "fantasias", "jogos de cartas",
    "kit de mágica",
    // Automotivo
    "pneus", "GPS automotivo", "som automotivo", "suporte veicular para celular",
    "capa de volante", "tapetes para carro", "câmera de ré",
    "kit de primeiros socorros para carro", "carregador veicular",
    "aspirador de pó automotivo",
    // Pet shop
    "ração para pets", "coleira", "casinha para pets", "brinquedos para pets",
    "caixa de transporte", "arranhador", "comedouro automático", "aquário",
    "areia higiênica", "bebedouro para pets",
];

/// Fans out search-then-categorize pipelines across many product terms.
pub struct BatchOrchestrator<'a, P, I, B>
where
    P: SearchProxyClient,
    I: TokenIssuer,
    B: GenerationBackend,
{
    gateway: &'a SearchGateway<P, I>,
    runner: &'a GenerationJobRunner<B>,
}

impl<'a, P, I, B> BatchOrchestrator<'a, P, I, B>
where
    P: SearchProxyClient,
    I: TokenIssuer,
    B: GenerationBackend,
{
    /// Create an orchestrator over a shared gateway and job runner.
    pub fn new(gateway: &'a SearchGateway<P, I>, runner: &'a GenerationJobRunner<B>) -> Self {
        Self { gateway, runner }
    }

    /// Run one pipeline per term concurrently and join all of them.
    ///
    /// Always returns exactly one entry per requested term. Failed
    /// pipelines settle as inline error entries; no failure aborts the
    /// batch. Only returns once every pipeline has settled.
    pub async fn run_batch(&self, terms: &[String]) -> CategorizedResult {
        info!(terms = terms.len(), "starting batch");

        let pipelines = terms.iter().map(|term| async move {
            let entry = match self.run_term(term).await {
                Ok(categorization) => TermEntry::Categorized(categorization),
                Err(err) => {
                    warn!(term = term.as_str(), error = %err, "term pipeline failed");
                    TermEntry::Error {
                        error: err.to_string(),
                    }
                }
            };
            (term.clone(), entry)
        });

        let settled = futures::future::join_all(pipelines).await;
        let result: CategorizedResult = settled.into_iter().collect();
        info!(
            terms = terms.len(),
            errors = result.iter().filter(|(_, e)| e.is_error()).count(),
            "batch settled"
        );
        result
    }

    /// One term's pipeline: degradation-aware search, then categorization.
    async fn run_term(&self, term: &str) -> Result<serde_json::Value> {
        let outcome = self.gateway.search_product(term).await?;
        let payload = serde_json::json!({
            "product_type": term,
            "results": outcome.results,
        });
        self.runner.run_to_completion(&payload).await
    }
}
