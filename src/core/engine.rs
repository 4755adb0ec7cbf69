use super::types::MonthTracePoint;

const MONTHS_PER_YEAR: f64 = 12.0;

/// Straight-line amortizing loan. The monthly amortization is fixed at
/// creation and does not follow the declining balance.
#[derive(Debug, Clone)]
pub(crate) struct Loan {
    debt: f64,
    interest_rate: f64,
    min_amortization_per_month: f64,
}

impl Loan {
    pub(crate) fn new(amount: f64, interest_rate: f64, amortization_rate: f64) -> Self {
        Self {
            debt: amount,
            interest_rate,
            min_amortization_per_month: (amortization_rate / MONTHS_PER_YEAR) * amount,
        }
    }

    pub(crate) fn debt(&self) -> f64 {
        self.debt
    }

    /// Linear monthly interest on the current debt (annual / 12, not compounded).
    pub(crate) fn interest_cost(&self) -> f64 {
        (self.interest_rate / MONTHS_PER_YEAR) * self.debt
    }

    /// Pays the scheduled monthly amount and returns what was actually repaid.
    pub(crate) fn amortize(&mut self) -> f64 {
        self.amortize_by(self.min_amortization_per_month)
    }

    /// Reduces the debt by `amount`, never below zero. The returned value
    /// excludes any overpayment.
    pub(crate) fn amortize_by(&mut self, amount: f64) -> f64 {
        self.debt -= amount;

        if self.debt < 0.0 {
            let overpaid = -self.debt;
            self.debt = 0.0;
            return amount - overpaid;
        }

        amount
    }
}

/// Monthly rate whose twelve-fold compounding reproduces `annual`.
fn monthly_equivalent_rate(annual: f64) -> f64 {
    (1.0 + annual).powf(1.0 / MONTHS_PER_YEAR) - 1.0
}

#[derive(Debug, Clone)]
pub struct Simulation {
    loans: Vec<Loan>,
    monthly_income: f64,
    rent: f64,
    stock_interest_monthly: f64,
    property_interest_monthly: f64,
    total_payed: f64,
    total_amortized: f64,
    // What everything paid so far would be worth had it been invested instead.
    ghost_savings: f64,
    invest_money_in_the_bank: bool,
    payed_this_month: f64,
    property_value: f64,
    money_in_the_bank: f64,
    months_elapsed: u32,
}

impl Simulation {
    pub fn new(
        starting_balance: f64,
        annual_stock_interest: f64,
        annual_property_interest: f64,
    ) -> Self {
        Self {
            loans: Vec::new(),
            monthly_income: 0.0,
            rent: 0.0,
            stock_interest_monthly: monthly_equivalent_rate(annual_stock_interest),
            property_interest_monthly: monthly_equivalent_rate(annual_property_interest),
            total_payed: 0.0,
            total_amortized: 0.0,
            ghost_savings: 0.0,
            invest_money_in_the_bank: false,
            payed_this_month: 0.0,
            property_value: 0.0,
            money_in_the_bank: starting_balance,
            months_elapsed: 0,
        }
    }

    /// Simulation with zero market and property growth.
    pub fn with_balance(starting_balance: f64) -> Self {
        Self::new(starting_balance, 0.0, 0.0)
    }

    pub fn add_income(&mut self, monthly_income: f64) -> &mut Self {
        self.monthly_income += monthly_income;
        self
    }

    pub fn add_rent(&mut self, rent: f64) -> &mut Self {
        self.rent += rent;
        self
    }

    /// Deposits the loan proceeds as cash and starts amortizing the loan on the next tick.
    pub fn take_loan(
        &mut self,
        amount: f64,
        interest_rate: f64,
        amortization_rate: f64,
    ) -> &mut Self {
        self.money_in_the_bank += amount;
        self.loans.push(Loan::new(amount, interest_rate, amortization_rate));
        self
    }

    pub fn buy_property(&mut self, property_value: f64) -> &mut Self {
        self.money_in_the_bank -= property_value;
        self.property_value += property_value;
        self
    }

    /// When enabled the cash balance compounds at the market rate every month.
    pub fn invest_money_in_the_bank(&mut self, enabled: bool) -> &mut Self {
        self.invest_money_in_the_bank = enabled;
        self
    }

    pub fn fast_forward(&mut self, months: u32) -> &mut Self {
        self.seed_ghost_savings();
        for _ in 0..months {
            self.do_month();
        }
        self
    }

    /// Same state effects as [`Simulation::fast_forward`], plus one trace row per month.
    pub fn fast_forward_traced(&mut self, months: u32) -> Vec<MonthTracePoint> {
        self.seed_ghost_savings();
        let mut trace = Vec::with_capacity(months as usize);
        for _ in 0..months {
            self.do_month();
            trace.push(self.trace_point());
        }
        trace
    }

    pub fn total_payed(&self) -> f64 {
        self.total_payed
    }

    pub fn total_amortized(&self) -> f64 {
        self.total_amortized
    }

    pub fn ghost_savings(&self) -> f64 {
        self.ghost_savings
    }

    pub fn money_in_the_bank(&self) -> f64 {
        self.money_in_the_bank
    }

    pub fn property_value(&self) -> f64 {
        self.property_value
    }

    pub fn rent(&self) -> f64 {
        self.rent
    }

    pub fn monthly_income(&self) -> f64 {
        self.monthly_income
    }

    pub fn stock_interest_monthly(&self) -> f64 {
        self.stock_interest_monthly
    }

    pub fn property_interest_monthly(&self) -> f64 {
        self.property_interest_monthly
    }

    pub fn invests_money_in_the_bank(&self) -> bool {
        self.invest_money_in_the_bank
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    pub fn months_elapsed(&self) -> u32 {
        self.months_elapsed
    }

    pub fn outstanding_debt(&self) -> f64 {
        self.loans.iter().map(Loan::debt).sum()
    }

    /// Net worth minus what all payments would have grown to in the market.
    /// Positive means the chosen strategy beat investing everything instead.
    pub fn total_revenue(&self) -> f64 {
        -(self.ghost_savings - self.total_payed) + self.money_in_the_bank + self.property_value
            - self.outstanding_debt()
    }

    // Equity owned when a run starts counts as money that could have been invested.
    // Every fast-forward call seeds again.
    fn seed_ghost_savings(&mut self) {
        self.ghost_savings += self.equity();
    }

    fn equity(&self) -> f64 {
        (self.property_value - self.outstanding_debt()).max(0.0)
    }

    fn do_month(&mut self) {
        // Beginning of month
        self.payed_this_month = 0.0;
        self.pay_rent();

        let payed_at_beginning_of_month = self.payed_this_month;
        self.ghost_savings += payed_at_beginning_of_month;

        // End of month
        self.apply_monthly_growth();
        self.pay_loan_interest();
        self.amortize_loans();

        // Loan costs only start compounding next month.
        self.ghost_savings += self.payed_this_month - payed_at_beginning_of_month;
        self.total_payed += self.payed_this_month;
        self.money_in_the_bank -= self.payed_this_month;
        self.money_in_the_bank += self.monthly_income;
        self.months_elapsed += 1;
    }

    fn pay_rent(&mut self) {
        self.payed_this_month += self.rent;
    }

    fn apply_monthly_growth(&mut self) {
        self.ghost_savings *= 1.0 + self.stock_interest_monthly;
        self.property_value *= 1.0 + self.property_interest_monthly;
        if self.invest_money_in_the_bank {
            self.money_in_the_bank *= 1.0 + self.stock_interest_monthly;
        }
    }

    fn pay_loan_interest(&mut self) {
        for loan in &self.loans {
            self.payed_this_month += loan.interest_cost();
        }
    }

    fn amortize_loans(&mut self) {
        for loan in &mut self.loans {
            let amortized = loan.amortize();
            self.payed_this_month += amortized;
            self.total_amortized += amortized;
        }
    }

    fn trace_point(&self) -> MonthTracePoint {
        MonthTracePoint {
            month: self.months_elapsed,
            payed_this_month: self.payed_this_month,
            total_payed: self.total_payed,
            total_amortized: self.total_amortized,
            ghost_savings: self.ghost_savings,
            money_in_the_bank: self.money_in_the_bank,
            property_value: self.property_value,
            outstanding_debt: self.outstanding_debt(),
            total_revenue: self.total_revenue(),
        }
    }
}
